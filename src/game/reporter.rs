//! Background score submission
//!
//! Submissions run on their own task so the frame loop never waits on the
//! network. Results come back through a channel and are drained by the
//! driver between frames.

use reqwest::Client;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::http::protocol::{ApiResponse, ErrorBody, ScoreRequest};
use crate::util::time::Timer;

use super::session::{ScoreSubmission, SubmissionResult};

/// Header carrying the context identifier
pub const POST_ID_HEADER: &str = "x-post-id";

/// Posts finished runs to `/api/score`
pub struct ScoreReporter {
    client: Client,
    base_url: String,
    post_id: String,
    token: Option<String>,
    results_tx: mpsc::UnboundedSender<SubmissionResult>,
    results_rx: mpsc::UnboundedReceiver<SubmissionResult>,
}

impl ScoreReporter {
    pub fn new(base_url: impl Into<String>, post_id: impl Into<String>, token: Option<String>) -> Self {
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            post_id: post_id.into(),
            token,
            results_tx,
            results_rx,
        }
    }

    /// Dispatch a submission without waiting for it. Must be called from
    /// within a tokio runtime.
    pub fn submit(&self, submission: ScoreSubmission) {
        let client = self.client.clone();
        let url = format!("{}/api/score", self.base_url);
        let post_id = self.post_id.clone();
        let token = self.token.clone();
        let results_tx = self.results_tx.clone();

        tokio::spawn(async move {
            let timer = Timer::new();
            match send_score(&client, &url, &post_id, token.as_deref(), submission.score).await {
                Ok(best_score) => {
                    debug!(
                        generation = submission.generation,
                        best_score,
                        elapsed_ms = timer.elapsed_ms(),
                        "Score submitted"
                    );
                    let _ = results_tx.send(SubmissionResult {
                        generation: submission.generation,
                        best_score,
                    });
                }
                Err(e) => {
                    // Offline or rejected; the local best already stands
                    warn!(error = %e, "Score submission failed");
                }
            }
        });
    }

    /// Results that arrived since the last call
    pub fn drain(&mut self) -> Vec<SubmissionResult> {
        let mut results = Vec::new();
        while let Ok(result) = self.results_rx.try_recv() {
            results.push(result);
        }
        results
    }
}

async fn send_score(
    client: &Client,
    url: &str,
    post_id: &str,
    token: Option<&str>,
    score: u32,
) -> Result<u32, ReportError> {
    let mut request = client
        .post(url)
        .header(POST_ID_HEADER, post_id)
        .json(&ScoreRequest { score });
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_default();
        return Err(ReportError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    match response.json::<ApiResponse>().await? {
        ApiResponse::Score { best_score, .. } => Ok(best_score),
        _ => Err(ReportError::UnexpectedResponse),
    }
}

/// Score reporting errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Score rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Unexpected response type")]
    UnexpectedResponse,
}
