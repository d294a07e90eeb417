// SQLite inventory store. Uses sqlx for async + connection pooling.
//
// Query functions in the submodules take `&mut SqliteConnection` so the same code runs
// against a pooled connection or inside a transaction (`&mut tx`). `Store` owns the pool
// and the maintenance operations.

pub mod details;
pub mod discovery;
pub mod metrics;
mod schema;
pub mod servers;
pub mod services;
pub mod stats;
pub mod tags;

use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Transaction;
use std::path::Path;
use std::str::FromStr;
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid row: {0}")]
    InvalidRow(String),
}

/// Current time as unix milliseconds; every stored timestamp uses this unit.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Opens a transaction that holds the write lock from its first statement (`BEGIN IMMEDIATE`).
/// Concurrent writers then wait on the busy timeout instead of failing with a stale read
/// snapshot when they upgrade from read to write.
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    retention_ms: i64,
}

impl Store {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention_days: u32,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        let retention_ms = (retention_days as i64) * 24 * 60 * 60 * 1000;
        Ok(Self { pool, retention_ms })
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        schema::init_schema(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Delete time-series and audit rows older than the retention window.
    /// Open ports go with their discovery result (ON DELETE CASCADE).
    #[instrument(skip(self), fields(repo = "store", operation = "prune_old_data"))]
    pub async fn prune_old_data(&self) -> Result<u64, StoreError> {
        let cutoff = now_ms() - self.retention_ms;
        let mut tx = self.pool.begin().await?;
        let mut removed = 0;
        removed += sqlx::query("DELETE FROM server_metrics WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        removed += sqlx::query("DELETE FROM server_services WHERE last_checked < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        removed += sqlx::query("DELETE FROM discovery_results WHERE finished_at < $1")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        Ok(removed)
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "store", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<(), StoreError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}
