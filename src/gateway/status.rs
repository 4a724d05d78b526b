use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::observability::metrics::Metrics;

use super::{GatewayError, REQUEST_TIMEOUT};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(150);

/// Authoritative order status lookup. The event processor treats bus events
/// as hints and this as the source of truth.
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn order_status(&self, order_id: &str) -> Result<String, GatewayError>;
}

pub struct OrderStatusGateway {
    base_url: String,
    client: reqwest::Client,
    max_attempts: u32,
    base_delay: Duration,
    metrics: Metrics,
}

#[derive(Deserialize)]
struct OrderStatusResponse {
    #[serde(default)]
    status: String,
}

impl OrderStatusGateway {
    pub fn new(base_url: &str, metrics: Metrics) -> Result<Self, GatewayError> {
        Self::with_retry(base_url, metrics, DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }

    pub fn with_retry(
        base_url: &str,
        metrics: Metrics,
        max_attempts: u32,
        base_delay: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            max_attempts: max_attempts.max(1),
            base_delay,
            metrics,
        })
    }

    async fn fetch_status(&self, url: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;

        let code = response.status();
        if code != reqwest::StatusCode::OK {
            return Err(GatewayError::Status(code.as_u16()));
        }

        let payload: OrderStatusResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))?;

        let status = payload.status.trim().to_string();
        if status.is_empty() {
            return Err(GatewayError::EmptyStatus);
        }

        Ok(status)
    }
}

fn should_retry(err: &GatewayError) -> bool {
    match err {
        GatewayError::Status(code) => matches!(code, 408 | 429) || (500..=599).contains(code),
        GatewayError::Transport(err) => err.is_timeout(),
        _ => false,
    }
}

#[async_trait]
impl StatusSource for OrderStatusGateway {
    async fn order_status(&self, order_id: &str) -> Result<String, GatewayError> {
        if order_id.is_empty() {
            return Err(GatewayError::EmptyOrderId);
        }

        let url = format!("{}/public/api/v1/order/{}", self.base_url, order_id);

        let mut attempt = 1;
        loop {
            match self.fetch_status(&url).await {
                Ok(status) => return Ok(status),
                Err(err) => {
                    if !should_retry(&err) || attempt == self.max_attempts {
                        return Err(err);
                    }

                    self.metrics.gateway_retries_total.inc();
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(attempt, delay = ?delay, error = %err, "order status fetch retrying");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn counting_stub(hits: Arc<AtomicU32>, failures: u32, failure_code: StatusCode) -> Router {
        Router::new().route(
            "/public/api/v1/order/:id",
            get(move || {
                let hits = hits.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    if n <= failures {
                        failure_code.into_response()
                    } else {
                        Json(json!({ "status": "delivered" })).into_response()
                    }
                }
            }),
        )
    }

    fn gateway(base: &str) -> OrderStatusGateway {
        OrderStatusGateway::with_retry(base, Metrics::new(), 3, Duration::from_millis(5)).unwrap()
    }

    #[tokio::test]
    async fn retries_on_429_then_succeeds() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = spawn_stub(counting_stub(hits.clone(), 2, StatusCode::TOO_MANY_REQUESTS)).await;

        let status = gateway(&base).order_status("o1").await.unwrap();

        assert_eq!(status, "delivered");
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let hits = Arc::new(AtomicU32::new(0));
        let base =
            spawn_stub(counting_stub(hits.clone(), 10, StatusCode::INTERNAL_SERVER_ERROR)).await;

        let err = gateway(&base).order_status("o1").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status(500)));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_client_errors() {
        let hits = Arc::new(AtomicU32::new(0));
        let base = spawn_stub(counting_stub(hits.clone(), 10, StatusCode::NOT_FOUND)).await;

        let err = gateway(&base).order_status("o1").await.unwrap_err();

        assert!(matches!(err, GatewayError::Status(404)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_status_is_an_error() {
        let app = Router::new().route(
            "/public/api/v1/order/:id",
            get(|| async { Json(json!({ "status": "  " })) }),
        );
        let base = spawn_stub(app).await;

        let err = gateway(&base).order_status("o1").await.unwrap_err();

        assert!(matches!(err, GatewayError::EmptyStatus));
    }

    #[tokio::test]
    async fn status_is_trimmed() {
        let app = Router::new().route(
            "/public/api/v1/order/:id",
            get(|| async { Json(json!({ "status": " Delivered " })) }),
        );
        let base = spawn_stub(app).await;

        let status = gateway(&base).order_status("o1").await.unwrap();

        assert_eq!(status, "Delivered");
    }

    #[tokio::test]
    async fn empty_order_id_fails_without_a_request() {
        let err = gateway("http://127.0.0.1:1")
            .order_status("")
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::EmptyOrderId));
    }
}
