use std::sync::Arc;

use adreel_core::{AdDelivery, AdRepository, PerformanceTracker, SelectionPolicy};
use adreel_store::app_config::RateLimitConfig;
use adreel_store::{EventProducer, RedisClient};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn AdRepository>,
    pub delivery: AdDelivery,
    pub tracker: PerformanceTracker,
    pub redis: Option<Arc<RedisClient>>,
    pub events: Option<Arc<EventProducer>>,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn AdRepository>,
        selection: SelectionPolicy,
        auth: AuthConfig,
    ) -> Result<Self, prometheus::Error> {
        Ok(Self {
            delivery: AdDelivery::new(repo.clone(), selection),
            tracker: PerformanceTracker::new(repo.clone()),
            repo,
            redis: None,
            events: None,
            auth,
            rate_limit: RateLimitConfig::default(),
            metrics: Arc::new(Metrics::new()?),
        })
    }

    pub fn with_redis(mut self, redis: Arc<RedisClient>, rate_limit: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_events(mut self, events: Arc<EventProducer>) -> Self {
        self.events = Some(events);
        self
    }
}
