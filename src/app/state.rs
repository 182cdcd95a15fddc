//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::service::{PublishService, ScoreService};
use crate::social::{LoggingPoster, RedditClient, SharedPoster};
use crate::store::{MemoryStore, RedisRestClient, SharedStore};
use crate::util::rate_limit::RequestThrottle;
use crate::util::time::{SharedClock, SystemClock};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub scores: ScoreService,
    pub publishing: PublishService,
    pub throttle: RequestThrottle,
    pub clock: SharedClock,
}

impl AppState {
    /// Pick production backends when configured, in-process ones otherwise
    pub fn new(config: Config) -> Self {
        let store: SharedStore = match RedisRestClient::from_config(&config) {
            Some(client) => {
                info!("Using Redis REST store");
                Arc::new(client)
            }
            None => {
                info!("STORE_URL not set, using in-process store");
                Arc::new(MemoryStore::new())
            }
        };

        let poster: SharedPoster = match RedditClient::from_config(&config) {
            Some(client) => {
                info!("Using Reddit social poster");
                Arc::new(client)
            }
            None => {
                info!("SOCIAL_ACCESS_TOKEN not set, posts are only logged");
                Arc::new(LoggingPoster::default())
            }
        };

        Self::with_backends(config, store, poster, Arc::new(SystemClock))
    }

    pub fn with_backends(
        config: Config,
        store: SharedStore,
        poster: SharedPoster,
        clock: SharedClock,
    ) -> Self {
        let throttle = RequestThrottle::new(config.request_burst_per_sec);

        Self {
            config: Arc::new(config),
            scores: ScoreService::new(store.clone(), clock.clone()),
            publishing: PublishService::new(store, clock.clone(), poster),
            throttle,
            clock,
        }
    }
}
