//! JSON wire types shared by the API handlers and the score reporter

use serde::{Deserialize, Serialize};

/// A single leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub username: String,
    pub score: u32,
}

/// Body of every score-carrying POST
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreRequest {
    pub score: u32,
}

/// Successful responses, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ApiResponse {
    /// Bootstrap data for a freshly loaded client
    Init {
        post_id: String,
        username: String,
        best_score: u32,
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// Result of a score submission
    Score {
        post_id: String,
        new_best: bool,
        best_score: u32,
        leaderboard: Vec<LeaderboardEntry>,
    },
    Leaderboard {
        post_id: String,
        leaderboard: Vec<LeaderboardEntry>,
    },
    /// A score published as a new post
    Publish { post_id: String, post_url: String },
    /// A score posted as a comment
    Comment { comment_id: String },
}

/// Error envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Health check payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}
