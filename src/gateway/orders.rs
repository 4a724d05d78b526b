use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::order::Order;

use super::{GatewayError, REQUEST_TIMEOUT};

/// Candidate-order source the poller drains. Implemented over the order
/// service's HTTP surface; mocked in poller tests.
#[async_trait]
pub trait OrderFeed: Send + Sync {
    async fn orders_since(&self, from: DateTime<Utc>) -> Result<Vec<Order>, GatewayError>;
}

#[async_trait]
impl<T: OrderFeed> OrderFeed for Arc<T> {
    async fn orders_since(&self, from: DateTime<Utc>) -> Result<Vec<Order>, GatewayError> {
        (**self).orders_since(from).await
    }
}

pub struct OrderFeedClient {
    base_url: String,
    client: reqwest::Client,
}

impl OrderFeedClient {
    pub fn new(addr: &str) -> Result<Self, GatewayError> {
        let trimmed = addr.trim_end_matches('/');
        let base_url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{trimmed}")
        };

        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl OrderFeed for OrderFeedClient {
    async fn orders_since(&self, from: DateTime<Utc>) -> Result<Vec<Order>, GatewayError> {
        let url = format!("{}/orders", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("from", from.to_rfc3339())])
            .header("accept", "application/json")
            .send()
            .await?;

        let code = response.status();
        if code != reqwest::StatusCode::OK {
            return Err(GatewayError::Status(code.as_u16()));
        }

        let orders: Vec<Order> = response
            .json()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))?;

        Ok(orders)
    }
}
