use std::sync::Arc;

use config::Config;
use limiter::RateLimiter;
use store::MetricsStore;

pub mod config;
pub mod error;
pub mod limiter;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod store;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: MetricsStore,
    pub limiter: Arc<RateLimiter>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: MetricsStore, config: Config) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            store,
            limiter,
            config: Arc::new(config),
        }
    }
}
