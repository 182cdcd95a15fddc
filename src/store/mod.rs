//! Persistent key-value / sorted-set store
//!
//! Handlers never read-then-write the same key. Every per-identity mutation
//! goes through one of the atomic primitives below so that two near
//! simultaneous requests from the same user cannot both act on a stale read.

pub mod memory;
pub mod redis_rest;

use futures::future::BoxFuture;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use redis_rest::RedisRestClient;

/// Sorted set holding one entry per username
pub const LEADERBOARD_KEY: &str = "leaderboard";
/// Number of leaderboard rows returned on every read
pub const LEADERBOARD_SIZE: usize = 3;

pub fn best_key(username: &str) -> String {
    format!("best:{}", username)
}

pub fn score_rate_key(username: &str) -> String {
    format!("rate:{}", username)
}

pub fn publish_rate_key(username: &str) -> String {
    format!("rate:pub:{}", username)
}

pub fn comment_rate_key(username: &str) -> String {
    format!("rate:cmt:{}", username)
}

/// Sorted-set member with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Store operations used by the API
pub trait ScoreStore: Send + Sync {
    /// Plain string read
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Atomically raise an integer value: writes `value` only if it is
    /// strictly greater than what is stored (absent counts as 0). Returns the
    /// value stored before the call.
    fn set_max<'a>(&'a self, key: &'a str, value: i64) -> BoxFuture<'a, Result<i64, StoreError>>;

    /// Atomically claim a fixed window. If the timestamp stored under `key` is
    /// less than `window_ms` older than `now_ms` nothing is written and the
    /// claim fails; otherwise `now_ms` is stored and the claim succeeds.
    fn claim_window<'a>(
        &'a self,
        key: &'a str,
        now_ms: i64,
        window_ms: i64,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;

    /// Members ranked `start..=stop` by descending score
    fn z_range_rev<'a>(
        &'a self,
        key: &'a str,
        start: usize,
        stop: usize,
    ) -> BoxFuture<'a, Result<Vec<ScoredMember>, StoreError>>;

    fn z_score<'a>(
        &'a self,
        key: &'a str,
        member: &'a str,
    ) -> BoxFuture<'a, Result<Option<f64>, StoreError>>;

    /// Add `member`, or update it only if `score` is strictly greater than its
    /// current score. Returns true if anything was written.
    fn z_add_gt<'a>(
        &'a self,
        key: &'a str,
        member: &'a str,
        score: f64,
    ) -> BoxFuture<'a, Result<bool, StoreError>>;
}

/// Shared store handle
pub type SharedStore = Arc<dyn ScoreStore>;

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Store command failed: {0}")]
    Command(String),

    #[error("Unexpected store reply: {0}")]
    Reply(String),

    #[error("Store unavailable")]
    Unavailable,
}
