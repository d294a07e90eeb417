// Status recorder: terminal status of a pass, written outside the pass transaction so it
// lands even when the pass rolled back. Failures here are logged, never returned.

use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::models::{DiscoveryResult, ServerStatus};
use crate::store::{StoreError, discovery, now_ms, servers};

#[derive(Clone)]
pub struct StatusRecorder {
    pool: SqlitePool,
}

impl StatusRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Sets status, `last_checked = now` and `last_error` (cleared for `online`).
    pub async fn record_status(&self, server_id: i64, status: ServerStatus, error: Option<&str>) {
        let error = match status {
            ServerStatus::Online => None,
            _ => error,
        };
        match self.try_record_status(server_id, status, error).await {
            Ok(true) => debug!(server_id, status = %status, "status recorded"),
            Ok(false) => warn!(server_id, status = %status, "status not recorded: no such server"),
            Err(e) => warn!(
                server_id,
                status = %status,
                error = %e,
                operation = "record_status",
                "failed to record server status"
            ),
        }
    }

    async fn try_record_status(
        &self,
        server_id: i64,
        status: ServerStatus,
        error: Option<&str>,
    ) -> Result<bool, StoreError> {
        let mut conn = self.pool.acquire().await?;
        servers::set_status(&mut conn, server_id, status, error, now_ms()).await
    }

    /// Appends a failed discovery audit row.
    pub async fn record_failed_pass(&self, server_id: i64, started_at: i64, error: &str) {
        let result = DiscoveryResult {
            server_id,
            success: false,
            error: Some(error.to_string()),
            started_at,
            finished_at: now_ms(),
            ..Default::default()
        };
        if let Err(e) = self.try_insert_result(&result).await {
            warn!(
                server_id,
                error = %e,
                operation = "record_failed_pass",
                "failed to record discovery result"
            );
        }
    }

    async fn try_insert_result(&self, result: &DiscoveryResult) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        discovery::insert_result(&mut conn, result).await
    }
}
