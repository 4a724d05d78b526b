use thiserror::Error;
use tracing::info;

use crate::engine::coordinator::Dispatch;
use crate::gateway::status::StatusSource;
use crate::gateway::GatewayError;
use crate::models::event::{same_status, OrderEventKind, OrderStatusEvent};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid order event payload")]
    InvalidPayload,

    #[error("fetch order status: {0}")]
    Status(#[from] GatewayError),

    #[error("dispatch order event: {0}")]
    Dispatch(#[from] StoreError),
}

/// Reconciles bus events against the authoritative order service before
/// touching assignment state. Events are hints; the gateway is truth.
pub struct EventProcessor<S, D> {
    status: S,
    dispatch: D,
}

impl<S: StatusSource, D: Dispatch> EventProcessor<S, D> {
    pub fn new(status: S, dispatch: D) -> Self {
        Self { status, dispatch }
    }

    pub async fn handle(&self, event: &OrderStatusEvent) -> Result<(), ProcessError> {
        if event.order_id.trim().is_empty() || event.status.trim().is_empty() {
            return Err(ProcessError::InvalidPayload);
        }

        let actual = self.status.order_status(&event.order_id).await?;
        if !same_status(&actual, &event.status) {
            info!(
                order_id = %event.order_id,
                event_status = %event.status,
                actual_status = %actual,
                "order event skipped: status moved on"
            );
            return Ok(());
        }

        match OrderEventKind::parse(&event.status) {
            OrderEventKind::Created => {
                self.dispatch.assign(&event.order_id).await?;
            }
            OrderEventKind::Cancelled => {
                self.dispatch.unassign(&event.order_id).await?;
            }
            OrderEventKind::Completed => {
                self.dispatch.complete(&event.order_id).await?;
            }
            OrderEventKind::Other => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::models::courier::{Courier, CourierStatus, TransportType};
    use crate::models::delivery::{Delivery, OrderRelease};

    use super::*;

    struct FixedStatus(&'static str);

    #[async_trait]
    impl StatusSource for FixedStatus {
        async fn order_status(&self, _order_id: &str) -> Result<String, GatewayError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingStatus;

    #[async_trait]
    impl StatusSource for FailingStatus {
        async fn order_status(&self, _order_id: &str) -> Result<String, GatewayError> {
            Err(GatewayError::Status(503))
        }
    }

    #[derive(Default)]
    struct RecordingDispatch {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingDispatch {
        fn record(&self, operation: &str, order_id: &str) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("{operation}:{order_id}"));
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Dispatch for RecordingDispatch {
        async fn assign(&self, order_id: &str) -> Result<(Delivery, Courier), StoreError> {
            self.record("assign", order_id);
            Ok((
                Delivery {
                    id: 1,
                    courier_id: 1,
                    order_id: order_id.to_string(),
                    assigned_at: Utc::now(),
                    deadline: Utc::now(),
                },
                Courier {
                    id: 1,
                    name: "test-courier".to_string(),
                    phone: "+10000000000".to_string(),
                    status: CourierStatus::Busy,
                    transport_type: TransportType::Car,
                    assignments_count: 1,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
            ))
        }

        async fn unassign(&self, order_id: &str) -> Result<OrderRelease, StoreError> {
            self.record("unassign", order_id);
            Ok(OrderRelease {
                order_id: order_id.to_string(),
                courier_id: 1,
            })
        }

        async fn complete(&self, order_id: &str) -> Result<OrderRelease, StoreError> {
            self.record("complete", order_id);
            Ok(OrderRelease {
                order_id: order_id.to_string(),
                courier_id: 1,
            })
        }
    }

    fn event(order_id: &str, status: &str) -> OrderStatusEvent {
        OrderStatusEvent {
            order_id: order_id.to_string(),
            status: status.to_string(),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn mismatched_status_skips_without_dispatch() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FixedStatus("delivered"), dispatch.clone());

        processor.handle(&event("o9", "created")).await.unwrap();

        assert!(dispatch.calls().is_empty());
    }

    #[tokio::test]
    async fn created_event_assigns() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FixedStatus("created"), dispatch.clone());

        processor.handle(&event("o1", "created")).await.unwrap();

        assert_eq!(dispatch.calls(), vec!["assign:o1"]);
    }

    #[tokio::test]
    async fn both_cancel_spellings_unassign() {
        let dispatch = Arc::new(RecordingDispatch::default());

        let processor = EventProcessor::new(FixedStatus("cancelled"), dispatch.clone());
        processor.handle(&event("o1", "cancelled")).await.unwrap();

        let processor = EventProcessor::new(FixedStatus("canceled"), dispatch.clone());
        processor.handle(&event("o2", "canceled")).await.unwrap();

        assert_eq!(dispatch.calls(), vec!["unassign:o1", "unassign:o2"]);
    }

    #[tokio::test]
    async fn delivered_event_completes() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FixedStatus("delivered"), dispatch.clone());

        processor.handle(&event("o3", "delivered")).await.unwrap();

        assert_eq!(dispatch.calls(), vec!["complete:o3"]);
    }

    #[tokio::test]
    async fn status_match_is_case_insensitive() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FixedStatus("Created"), dispatch.clone());

        processor.handle(&event("o4", " created ")).await.unwrap();

        assert_eq!(dispatch.calls(), vec!["assign:o4"]);
    }

    #[tokio::test]
    async fn unknown_status_is_acknowledged_without_action() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FixedStatus("preparing"), dispatch.clone());

        processor.handle(&event("o5", "preparing")).await.unwrap();

        assert!(dispatch.calls().is_empty());
    }

    #[tokio::test]
    async fn blank_fields_are_rejected_before_any_call() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FailingStatus, dispatch.clone());

        let err = processor.handle(&event("", "created")).await.unwrap_err();
        assert!(matches!(err, ProcessError::InvalidPayload));

        let err = processor.handle(&event("o1", "  ")).await.unwrap_err();
        assert!(matches!(err, ProcessError::InvalidPayload));

        assert!(dispatch.calls().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_propagates() {
        let dispatch = Arc::new(RecordingDispatch::default());
        let processor = EventProcessor::new(FailingStatus, dispatch.clone());

        let err = processor.handle(&event("o1", "created")).await.unwrap_err();

        assert!(matches!(err, ProcessError::Status(_)));
        assert!(dispatch.calls().is_empty());
    }

    #[tokio::test]
    async fn dispatch_failure_propagates() {
        struct ExhaustedDispatch;

        #[async_trait]
        impl Dispatch for ExhaustedDispatch {
            async fn assign(&self, _order_id: &str) -> Result<(Delivery, Courier), StoreError> {
                Err(StoreError::CourierNotFound)
            }

            async fn unassign(&self, _order_id: &str) -> Result<OrderRelease, StoreError> {
                Err(StoreError::DeliveryNotFound)
            }

            async fn complete(&self, _order_id: &str) -> Result<OrderRelease, StoreError> {
                Err(StoreError::DeliveryNotFound)
            }
        }

        let processor = EventProcessor::new(FixedStatus("created"), ExhaustedDispatch);

        let err = processor.handle(&event("o1", "created")).await.unwrap_err();

        assert!(matches!(
            err,
            ProcessError::Dispatch(StoreError::CourierNotFound)
        ));
    }
}
