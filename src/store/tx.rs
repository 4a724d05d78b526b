use std::future::Future;
use std::sync::Arc;

use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::StoreError;

type TxSlot = Arc<Mutex<Transaction<'static, Postgres>>>;

tokio::task_local! {
    static AMBIENT_TX: TxSlot;
}

fn ambient() -> Option<TxSlot> {
    AMBIENT_TX.try_with(Clone::clone).ok()
}

/// Resolves the connection a store operation should run on: the ambient
/// transaction when inside a `with_tx` scope, the pool otherwise.
pub(crate) async fn db(pool: &PgPool) -> Result<DbHandle, StoreError> {
    match ambient() {
        Some(slot) => Ok(DbHandle::Tx(slot.lock_owned().await)),
        None => Ok(DbHandle::Pool(pool.acquire().await?)),
    }
}

pub(crate) enum DbHandle {
    Pool(PoolConnection<Postgres>),
    Tx(OwnedMutexGuard<Transaction<'static, Postgres>>),
}

impl DbHandle {
    pub(crate) fn conn(&mut self) -> &mut PgConnection {
        match self {
            DbHandle::Pool(conn) => &mut **conn,
            DbHandle::Tx(guard) => &mut ***guard,
        }
    }
}

#[derive(Clone)]
pub struct TxManager {
    pool: PgPool,
}

impl TxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs `op` inside a single transaction. Every store call made while the
    /// returned future is polled resolves to the same transaction through the
    /// ambient slot. Commits on `Ok`, rolls back on `Err`; dropping the future
    /// mid-flight drops the transaction, which also rolls back.
    pub async fn with_tx<F, Fut, T>(&self, op: F) -> Result<T, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let tx = self.pool.begin().await?;
        let slot: TxSlot = Arc::new(Mutex::new(tx));

        let result = AMBIENT_TX.scope(slot.clone(), op()).await;

        let tx = match Arc::try_unwrap(slot) {
            Ok(mutex) => mutex.into_inner(),
            Err(_) => return Err(StoreError::Internal("transaction scope leaked".to_string())),
        };

        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }
}
