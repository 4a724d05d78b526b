use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::coordinator::Dispatch;
use crate::gateway::orders::OrderFeed;

const POLL_INTERVAL: Duration = Duration::from_secs(5);

fn poll_floor(now: DateTime<Utc>) -> DateTime<Utc> {
    now - chrono::Duration::seconds(5)
}

pub struct OrderPoller<F, D> {
    feed: F,
    dispatch: D,
    watermark: DateTime<Utc>,
}

impl<F: OrderFeed, D: Dispatch> OrderPoller<F, D> {
    pub fn new(feed: F, dispatch: D) -> Self {
        Self {
            feed,
            dispatch,
            watermark: poll_floor(Utc::now()),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + POLL_INTERVAL;
        let mut ticker = tokio::time::interval_at(start, POLL_INTERVAL);

        info!("order poller started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("order poller stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.poll_once(Utc::now()).await;
                }
            }
        }
    }

    async fn poll_once(&mut self, now: DateTime<Utc>) {
        // the floor bounds how far one tick may jump ahead, so orders the
        // feed publishes retroactively within 5s are still picked up
        let floor = poll_floor(now);
        let cursor = self.watermark.max(floor);

        let orders = match self.feed.orders_since(cursor).await {
            Ok(orders) => orders,
            Err(err) => {
                error!(error = %err, "failed to fetch orders");
                return;
            }
        };

        let mut batch_max = cursor;
        for order in &orders {
            if order.created_at > batch_max {
                batch_max = order.created_at;
            }

            if let Err(err) = self.dispatch.assign(&order.id).await {
                error!(order_id = %order.id, error = %err, "failed to assign courier to order");
            }
        }

        // monotonic: a lagging feed clock must never drag the cursor back
        let advance = if orders.is_empty() { floor } else { batch_max };
        self.watermark = self.watermark.max(advance);
    }
}
