use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::models::courier::{Courier, CourierStatus, NewCourier, TransportType};

use super::{is_unique_violation, tx, StoreError};

const COURIER_COLUMNS: &str =
    "id, name, phone, status, transport_type, assignments_count, created_at, updated_at";

#[derive(Clone)]
pub struct CourierStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CourierRow {
    id: i32,
    name: String,
    phone: String,
    status: String,
    transport_type: String,
    assignments_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CourierRow> for Courier {
    type Error = StoreError;

    fn try_from(row: CourierRow) -> Result<Self, StoreError> {
        let status = CourierStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Internal(format!("unknown courier status {:?}", row.status)))?;
        // unknown transport kinds in stored rows degrade to the on-foot offset
        let transport_type =
            TransportType::parse(&row.transport_type).unwrap_or(TransportType::OnFoot);

        Ok(Courier {
            id: row.id,
            name: row.name,
            phone: row.phone,
            status,
            transport_type,
            assignments_count: row.assignments_count,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl CourierStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, courier: &NewCourier) -> Result<i32, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let (id,): (i32,) = sqlx::query_as(
            "INSERT INTO couriers(name, phone, status, transport_type) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(&courier.name)
        .bind(&courier.phone)
        .bind(courier.status.as_str())
        .bind(courier.transport_type.as_str())
        .fetch_one(db.conn())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::PhoneExists
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(id)
    }

    pub async fn update(&self, id: i32, courier: &NewCourier) -> Result<(), StoreError> {
        let mut db = tx::db(&self.pool).await?;
        sqlx::query_as::<_, (i32,)>(
            "UPDATE couriers SET name=$1, phone=$2, status=$3, transport_type=$4, updated_at=NOW() \
             WHERE id=$5 RETURNING id",
        )
        .bind(&courier.name)
        .bind(&courier.phone)
        .bind(courier.status.as_str())
        .bind(courier.transport_type.as_str())
        .bind(id)
        .fetch_one(db.conn())
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                StoreError::PhoneExists
            } else if matches!(err, sqlx::Error::RowNotFound) {
                StoreError::CourierNotFound
            } else {
                StoreError::Database(err)
            }
        })?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Courier, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let row: CourierRow =
            sqlx::query_as(&format!("SELECT {COURIER_COLUMNS} FROM couriers WHERE id=$1"))
                .bind(id)
                .fetch_one(db.conn())
                .await
                .map_err(courier_not_found)?;

        row.try_into()
    }

    pub async fn get_all(&self) -> Result<Vec<Courier>, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let rows: Vec<CourierRow> =
            sqlx::query_as(&format!("SELECT {COURIER_COLUMNS} FROM couriers ORDER BY id"))
                .fetch_all(db.conn())
                .await?;

        rows.into_iter().map(Courier::try_from).collect()
    }

    pub async fn get_by_status(&self, status: CourierStatus) -> Result<Vec<Courier>, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let rows: Vec<CourierRow> = sqlx::query_as(&format!(
            "SELECT {COURIER_COLUMNS} FROM couriers WHERE status=$1 ORDER BY id"
        ))
        .bind(status.as_str())
        .fetch_all(db.conn())
        .await?;

        rows.into_iter().map(Courier::try_from).collect()
    }

    /// The assignment primitive: picks the least-loaded available courier and
    /// locks its row for the current transaction, skipping rows locked by
    /// concurrent callers so parallel assigns never pick the same courier.
    pub async fn available_least_loaded(&self) -> Result<Courier, StoreError> {
        let mut db = tx::db(&self.pool).await?;
        let row: CourierRow = sqlx::query_as(&format!(
            "SELECT {COURIER_COLUMNS} FROM couriers \
             WHERE status=$1 \
             ORDER BY assignments_count ASC, id ASC \
             LIMIT 1 \
             FOR UPDATE SKIP LOCKED"
        ))
        .bind(CourierStatus::Available.as_str())
        .fetch_one(db.conn())
        .await
        .map_err(courier_not_found)?;

        row.try_into()
    }

    pub async fn mark_assigned(&self, id: i32) -> Result<(), StoreError> {
        let mut db = tx::db(&self.pool).await?;
        sqlx::query_as::<_, (i32,)>(
            "UPDATE couriers SET status=$1, assignments_count=assignments_count+1 \
             WHERE id=$2 RETURNING id",
        )
        .bind(CourierStatus::Busy.as_str())
        .bind(id)
        .fetch_one(db.conn())
        .await
        .map_err(courier_not_found)?;

        Ok(())
    }

    pub async fn set_status(&self, id: i32, status: CourierStatus) -> Result<(), StoreError> {
        let mut db = tx::db(&self.pool).await?;
        sqlx::query_as::<_, (i32,)>("UPDATE couriers SET status=$1 WHERE id=$2 RETURNING id")
            .bind(status.as_str())
            .bind(id)
            .fetch_one(db.conn())
            .await
            .map_err(courier_not_found)?;

        Ok(())
    }
}

fn courier_not_found(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::CourierNotFound,
        other => StoreError::Database(other),
    }
}
