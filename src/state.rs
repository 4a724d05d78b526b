use std::sync::Arc;

use crate::engine::coordinator::Coordinator;
use crate::observability::metrics::Metrics;
use crate::ratelimit::limiter::TokenBucketLimiter;
use crate::store::couriers::CourierStore;

pub struct AppState {
    pub couriers: CourierStore,
    pub coordinator: Arc<Coordinator>,
    pub limiter: TokenBucketLimiter,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        couriers: CourierStore,
        coordinator: Arc<Coordinator>,
        limiter: TokenBucketLimiter,
        metrics: Metrics,
    ) -> Self {
        Self {
            couriers,
            coordinator,
            limiter,
            metrics,
        }
    }
}
