//! Score submission, personal bests and the leaderboard

use tracing::{debug, info};

use crate::http::error::ApiError;
use crate::http::protocol::LeaderboardEntry;
use crate::store::{
    best_key, score_rate_key, SharedStore, LEADERBOARD_KEY, LEADERBOARD_SIZE,
};
use crate::util::time::SharedClock;

/// One accepted submission per identity per window
pub const SCORE_RATE_WINDOW_MS: i64 = 2_000;

/// Result of an accepted submission
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreOutcome {
    pub new_best: bool,
    pub best_score: u32,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Score service
#[derive(Clone)]
pub struct ScoreService {
    store: SharedStore,
    clock: SharedClock,
}

impl ScoreService {
    pub fn new(store: SharedStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Record a validated score for `username`
    pub async fn submit(&self, username: &str, score: u32) -> Result<ScoreOutcome, ApiError> {
        let now = self.clock.now_millis();
        let allowed = self
            .store
            .claim_window(&score_rate_key(username), now, SCORE_RATE_WINDOW_MS)
            .await?;
        if !allowed {
            debug!(username, "Score submission rate limited");
            return Err(ApiError::RateLimited(
                "slow down - too many submissions".to_string(),
            ));
        }

        let previous = self.store.set_max(&best_key(username), score as i64).await?;
        let previous = previous.clamp(0, u32::MAX as i64) as u32;
        self.store
            .z_add_gt(LEADERBOARD_KEY, username, score as f64)
            .await?;

        let new_best = score > previous;
        if new_best {
            info!(username, score, previous, "New personal best");
        }

        Ok(ScoreOutcome {
            new_best,
            best_score: score.max(previous),
            leaderboard: self.leaderboard().await?,
        })
    }

    /// Top entries by descending score with 1-based ranks
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, ApiError> {
        let members = self
            .store
            .z_range_rev(LEADERBOARD_KEY, 0, LEADERBOARD_SIZE - 1)
            .await?;

        Ok(members
            .into_iter()
            .take(LEADERBOARD_SIZE)
            .enumerate()
            .map(|(i, m)| LeaderboardEntry {
                rank: i as u32 + 1,
                username: m.member,
                score: m.score.max(0.0) as u32,
            })
            .collect())
    }

    /// Stored personal best, 0 when none
    pub async fn best_for(&self, username: &str) -> Result<u32, ApiError> {
        let raw = self.store.get(&best_key(username)).await?;
        Ok(raw.and_then(|v| v.parse::<u32>().ok()).unwrap_or(0))
    }
}
