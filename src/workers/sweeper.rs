use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::coordinator::Coordinator;
use crate::observability::metrics::Metrics;
use crate::store::StoreError;

pub async fn run_expiry_sweeper(
    coordinator: Arc<Coordinator>,
    metrics: Metrics,
    interval: Duration,
    cancel: CancellationToken,
) {
    let start = tokio::time::Instant::now() + interval;
    let mut ticker = tokio::time::interval_at(start, interval);

    info!(interval = ?interval, "delivery expiry sweeper started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("delivery expiry sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                match coordinator.release_expired().await {
                    Ok(0) => {}
                    Ok(released) => {
                        metrics.couriers_released_total.inc_by(released);
                        info!(released, "expired deliveries released couriers");
                    }
                    Err(StoreError::TableMissing) => {
                        warn!("delivery table does not exist, run migrations before expiry sweeps");
                    }
                    Err(err) => {
                        error!(error = %err, "failed to release expired deliveries");
                    }
                }
            }
        }
    }
}
