pub mod couriers;
pub mod deliveries;
pub mod tx;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("phone already exists")]
    PhoneExists,

    #[error("courier not found")]
    CourierNotFound,

    #[error("delivery not found")]
    DeliveryNotFound,

    #[error("order already assigned")]
    OrderAlreadyAssigned,

    #[error("delivery table does not exist")]
    TableMissing,

    #[error("internal storage error: {0}")]
    Internal(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub(crate) fn is_undefined_table(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("42P01"))
}
