use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::courier::CourierStatus;
use crate::models::delivery::{Delivery, NewDelivery};

use super::{is_undefined_table, is_unique_violation, tx, StoreError};

#[derive(Clone)]
pub struct DeliveryStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct DeliveryRow {
    id: i32,
    courier_id: i32,
    order_id: String,
    assigned_at: DateTime<Utc>,
    deadline: DateTime<Utc>,
}

impl From<DeliveryRow> for Delivery {
    fn from(row: DeliveryRow) -> Self {
        Delivery {
            id: row.id,
            courier_id: row.courier_id,
            order_id: row.order_id,
            assigned_at: row.assigned_at,
            deadline: row.deadline,
        }
    }
}

impl DeliveryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, delivery: &NewDelivery) -> Result<Delivery, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let row: DeliveryRow = sqlx::query_as(
            "INSERT INTO delivery(courier_id, order_id, deadline) VALUES ($1, $2, $3) \
             RETURNING id, courier_id, order_id, assigned_at, deadline",
        )
        .bind(delivery.courier_id)
        .bind(&delivery.order_id)
        .bind(delivery.deadline)
        .fetch_one(db.conn())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::OrderAlreadyAssigned
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(row.into())
    }

    pub async fn delete_by_order(&self, order_id: &str) -> Result<i32, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let (courier_id,): (i32,) =
            sqlx::query_as("DELETE FROM delivery WHERE order_id=$1 RETURNING courier_id")
                .bind(order_id)
                .fetch_one(db.conn())
                .await
                .map_err(delivery_not_found)?;

        Ok(courier_id)
    }

    pub async fn courier_of_order(&self, order_id: &str) -> Result<i32, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let (courier_id,): (i32,) =
            sqlx::query_as("SELECT courier_id FROM delivery WHERE order_id=$1")
                .bind(order_id)
                .fetch_one(db.conn())
                .await
                .map_err(delivery_not_found)?;

        Ok(courier_id)
    }

    /// One atomic statement: couriers with an overdue delivery go back to
    /// `available`, but only while they hold no other delivery that is still
    /// within its deadline. Running it again with no new expiries releases
    /// nothing.
    pub async fn release_expired(&self) -> Result<u64, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let released: Vec<(i32,)> = sqlx::query_as(
            "WITH expired AS (SELECT DISTINCT courier_id FROM delivery WHERE deadline < NOW()) \
             UPDATE couriers SET status=$1 \
             WHERE status=$2 AND id IN (SELECT courier_id FROM expired) \
               AND NOT EXISTS (SELECT 1 FROM delivery \
                               WHERE delivery.courier_id = couriers.id AND deadline >= NOW()) \
             RETURNING id",
        )
        .bind(CourierStatus::Available.as_str())
        .bind(CourierStatus::Busy.as_str())
        .fetch_all(db.conn())
        .await
        .map_err(|err| {
            if is_undefined_table(&err) {
                StoreError::TableMissing
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(released.len() as u64)
    }
}

fn delivery_not_found(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::DeliveryNotFound,
        other => StoreError::Database(other),
    }
}
