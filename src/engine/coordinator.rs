use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::models::courier::{Courier, CourierStatus};
use crate::models::delivery::{Delivery, NewDelivery, OrderRelease};
use crate::observability::metrics::Metrics;
use crate::store::couriers::CourierStore;
use crate::store::deliveries::DeliveryStore;
use crate::store::tx::TxManager;
use crate::store::StoreError;

use super::policy::DeliveryTimePolicy;

/// The state-machine seam the ingest pathways drive. Implemented by
/// [`Coordinator`]; mocked in poller and processor tests.
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn assign(&self, order_id: &str) -> Result<(Delivery, Courier), StoreError>;
    async fn unassign(&self, order_id: &str) -> Result<OrderRelease, StoreError>;
    async fn complete(&self, order_id: &str) -> Result<OrderRelease, StoreError>;
}

#[async_trait]
impl<T: Dispatch> Dispatch for Arc<T> {
    async fn assign(&self, order_id: &str) -> Result<(Delivery, Courier), StoreError> {
        (**self).assign(order_id).await
    }

    async fn unassign(&self, order_id: &str) -> Result<OrderRelease, StoreError> {
        (**self).unassign(order_id).await
    }

    async fn complete(&self, order_id: &str) -> Result<OrderRelease, StoreError> {
        (**self).complete(order_id).await
    }
}

pub struct Coordinator {
    couriers: CourierStore,
    deliveries: DeliveryStore,
    tx: TxManager,
    policy: DeliveryTimePolicy,
    metrics: Metrics,
}

impl Coordinator {
    pub fn new(
        couriers: CourierStore,
        deliveries: DeliveryStore,
        tx: TxManager,
        policy: DeliveryTimePolicy,
        metrics: Metrics,
    ) -> Self {
        Self {
            couriers,
            deliveries,
            tx,
            policy,
            metrics,
        }
    }

    pub async fn release_expired(&self) -> Result<u64, StoreError> {
        self.tx
            .with_tx(|| async move { self.deliveries.release_expired().await })
            .await
    }

    fn record<T>(&self, operation: &str, result: &Result<T, StoreError>) {
        let outcome = if result.is_ok() { "success" } else { "error" };
        self.metrics
            .assignments_total
            .with_label_values(&[operation, outcome])
            .inc();
    }
}

#[async_trait]
impl Dispatch for Coordinator {
    async fn assign(&self, order_id: &str) -> Result<(Delivery, Courier), StoreError> {
        let result = self
            .tx
            .with_tx(|| async move {
                let courier = self.couriers.available_least_loaded().await?;
                let deadline = self.policy.deadline(courier.transport_type, Utc::now());

                let delivery = self
                    .deliveries
                    .insert(&NewDelivery {
                        courier_id: courier.id,
                        order_id: order_id.to_string(),
                        deadline,
                    })
                    .await?;

                self.couriers.mark_assigned(courier.id).await?;

                Ok((delivery, courier))
            })
            .await;

        self.record("assign", &result);
        if let Ok((delivery, courier)) = &result {
            info!(
                order_id,
                courier_id = courier.id,
                transport = courier.transport_type.as_str(),
                deadline = %delivery.deadline,
                "order assigned"
            );
        }
        result
    }

    async fn unassign(&self, order_id: &str) -> Result<OrderRelease, StoreError> {
        let result = self
            .tx
            .with_tx(|| async move {
                let courier_id = self.deliveries.delete_by_order(order_id).await?;
                self.couriers
                    .set_status(courier_id, CourierStatus::Available)
                    .await?;

                Ok(OrderRelease {
                    order_id: order_id.to_string(),
                    courier_id,
                })
            })
            .await;

        self.record("unassign", &result);
        if let Ok(release) = &result {
            info!(order_id, courier_id = release.courier_id, "order unassigned");
        }
        result
    }

    async fn complete(&self, order_id: &str) -> Result<OrderRelease, StoreError> {
        let result = self
            .tx
            .with_tx(|| async move {
                let courier_id = self.deliveries.courier_of_order(order_id).await?;
                self.couriers
                    .set_status(courier_id, CourierStatus::Available)
                    .await?;

                // the delivery row stays behind as assignment history
                Ok(OrderRelease {
                    order_id: order_id.to_string(),
                    courier_id,
                })
            })
            .await;

        self.record("complete", &result);
        if let Ok(release) = &result {
            info!(order_id, courier_id = release.courier_id, "order completed");
        }
        result
    }
}
