pub mod orders;
pub mod status;

use std::time::Duration;

use thiserror::Error;

pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("order id is empty")]
    EmptyOrderId,

    #[error("order service status {0}")]
    Status(u16),

    #[error("order status is empty")]
    EmptyStatus,

    #[error("decode order response: {0}")]
    Decode(String),

    #[error("order service request failed: {0}")]
    Transport(#[from] reqwest::Error),
}
