// Detail reconciler: read a server's hardware record, or seed a synthetic one.
// Seeded attributes are a pure function of (server id, catalog), so reseeding is stable.

use serde::Deserialize;
use sqlx::SqliteConnection;
use std::sync::Arc;
use tracing::debug;

use crate::models::ServerDetail;
use crate::store::{StoreError, details};

const GIB: i64 = 1024 * 1024 * 1024;

/// Lookup tables for synthetic hardware. Loaded from config; `Default` is the built-in set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HardwareCatalog {
    pub cpu_models: Vec<String>,
    pub os_versions: Vec<String>,
    pub core_counts: Vec<i64>,
    /// Memory total is `memory_step_gb * (1 + id mod 4)` GiB.
    pub memory_step_gb: i64,
    /// Disk total is `disk_step_gb * (1 + id mod 5)` GiB.
    pub disk_step_gb: i64,
}

impl Default for HardwareCatalog {
    fn default() -> Self {
        Self {
            cpu_models: vec![
                "Intel Xeon E5-2680 v4".into(),
                "Intel Xeon Gold 6248R".into(),
                "AMD EPYC 7502P".into(),
                "AMD EPYC 7763".into(),
                "Intel Xeon Silver 4214".into(),
            ],
            os_versions: vec![
                "Ubuntu 22.04 LTS".into(),
                "Debian 12".into(),
                "Rocky Linux 9.3".into(),
                "Ubuntu 20.04 LTS".into(),
                "RHEL 8.9".into(),
            ],
            core_counts: vec![4, 8, 16, 32],
            memory_step_gb: 16,
            disk_step_gb: 256,
        }
    }
}

impl HardwareCatalog {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.cpu_models.is_empty(), "catalog.cpu_models must be non-empty");
        anyhow::ensure!(!self.os_versions.is_empty(), "catalog.os_versions must be non-empty");
        anyhow::ensure!(!self.core_counts.is_empty(), "catalog.core_counts must be non-empty");
        anyhow::ensure!(
            self.core_counts.iter().all(|&c| c > 0),
            "catalog.core_counts must all be > 0"
        );
        anyhow::ensure!(
            self.memory_step_gb > 0,
            "catalog.memory_step_gb must be > 0, got {}",
            self.memory_step_gb
        );
        anyhow::ensure!(
            self.disk_step_gb > 0,
            "catalog.disk_step_gb must be > 0, got {}",
            self.disk_step_gb
        );
        Ok(())
    }

    /// Deterministic attributes for `server_id`: list index is `id mod len`.
    pub fn synthesize(&self, server_id: i64) -> ServerDetail {
        ServerDetail {
            server_id,
            cpu_model: pick(&self.cpu_models, server_id)
                .cloned()
                .unwrap_or_else(|| "unknown".into()),
            cpu_cores: pick(&self.core_counts, server_id).copied().unwrap_or(1),
            memory_total: self.memory_step_gb * (1 + server_id.rem_euclid(4)) * GIB,
            disk_total: self.disk_step_gb * (1 + server_id.rem_euclid(5)) * GIB,
            os_version: pick(&self.os_versions, server_id)
                .cloned()
                .unwrap_or_else(|| "unknown".into()),
        }
    }
}

fn pick<T>(items: &[T], id: i64) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    items.get(id.rem_euclid(items.len() as i64) as usize)
}

#[derive(Clone)]
pub struct DetailReconciler {
    catalog: Arc<HardwareCatalog>,
}

impl DetailReconciler {
    pub fn new(catalog: Arc<HardwareCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &HardwareCatalog {
        &self.catalog
    }

    /// Existing record, or a freshly seeded one. At most one row is ever inserted per server:
    /// if a concurrent pass wins the insert, its row is read back and returned.
    pub async fn ensure_details(
        &self,
        conn: &mut SqliteConnection,
        server_id: i64,
    ) -> Result<ServerDetail, StoreError> {
        if let Some(existing) = details::get_details(&mut *conn, server_id).await? {
            return Ok(existing);
        }
        let seeded = self.catalog.synthesize(server_id);
        if details::insert_details_if_absent(&mut *conn, &seeded).await? {
            debug!(server_id, cpu_model = %seeded.cpu_model, "seeded server details");
            return Ok(seeded);
        }
        details::get_details(&mut *conn, server_id)
            .await?
            .ok_or_else(|| {
                StoreError::InvalidRow(format!(
                    "server_details for {server_id} missing after insert conflict"
                ))
            })
    }
}
