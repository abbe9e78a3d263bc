//! services/portal/src/adapters/pg_store.rs
//!
//! A PostgreSQL `AccessRepository`. The ledger is kept as two key/value rows
//! named after the durable storage keys, and both rows are written in one
//! transaction.

use apex_access_core::domain::{AccessLedger, APPROVED_USERS_KEY, REQUESTS_KEY};
use apex_access_core::ports::{AccessRepository, PortError, PortResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Postgres, Transaction};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn read_key<T: DeserializeOwned + Default>(&self, key: &str) -> PortResult<T> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM durable_store WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        match value {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(T::default()),
        }
    }
}

fn db_error(e: sqlx::Error) -> PortError {
    PortError::Storage(e.to_string())
}

async fn write_key(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
    json: String,
) -> PortResult<()> {
    sqlx::query(
        "INSERT INTO durable_store (key, value, updated_at) VALUES ($1, $2, now()) \
         ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = now()",
    )
    .bind(key)
    .bind(json)
    .execute(&mut **tx)
    .await
    .map_err(db_error)?;
    Ok(())
}

//=========================================================================================
// `AccessRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl AccessRepository for PgStore {
    async fn load(&self) -> PortResult<AccessLedger> {
        Ok(AccessLedger {
            requests: self.read_key(REQUESTS_KEY).await?,
            approved_users: self.read_key(APPROVED_USERS_KEY).await?,
        })
    }

    async fn store(&self, ledger: &AccessLedger) -> PortResult<()> {
        let requests = serde_json::to_string(&ledger.requests)?;
        let approved = serde_json::to_string(&ledger.approved_users)?;

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        write_key(&mut tx, REQUESTS_KEY, requests).await?;
        write_key(&mut tx, APPROVED_USERS_KEY, approved).await?;
        tx.commit().await.map_err(db_error)?;
        Ok(())
    }
}
