//! Request burst throttling in front of the API
//!
//! This is the coarse, in-process guard against request floods. The
//! per-action windows (one score per 2 s, one publish per 10 s) live in the
//! store so they survive restarts and are shared between instances.

use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Keyed rate limiter type alias
pub type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Default burst allowance per identity (requests per second)
pub const REQUEST_BURST_PER_SEC: u32 = 20;

/// Create a keyed rate limiter with the specified requests per second
pub fn create_keyed_limiter(requests_per_second: u32) -> Arc<KeyedLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Per-caller request throttle
#[derive(Clone)]
pub struct RequestThrottle {
    limiter: Arc<KeyedLimiter>,
}

impl RequestThrottle {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiter: create_keyed_limiter(requests_per_second),
        }
    }

    /// Check if a request from `key` is allowed (returns true if allowed)
    pub fn check(&self, key: &str) -> bool {
        self.limiter.check_key(&key.to_string()).is_ok()
    }

    /// Drop idle keys so the table does not grow without bound
    pub fn prune(&self) {
        self.limiter.retain_recent();
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(REQUEST_BURST_PER_SEC)
    }
}
