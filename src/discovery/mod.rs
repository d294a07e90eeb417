// Discovery orchestrator: one pass per eligible server.
//
// A pass runs detail reconcile -> service load -> metric simulate in one transaction, then
// the status recorder writes the outcome outside it. A failing server never stops the batch.

pub mod ingest;
mod locks;
mod status;

pub use ingest::{IngestError, IngestOutcome, IngestStep, apply_payload};
pub use locks::ServerLocks;
pub use status::StatusRecorder;

use futures_util::{FutureExt, StreamExt};
use sqlx::SqlitePool;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::models::{
    BatchReport, DiscoveryPayload, DiscoveryResult, MetricBands, MetricSample, Server,
    ServerDetail, ServerStatus,
};
use crate::reconcile::{DetailReconciler, RECENT_SERVICES_LIMIT, load_recent_services};
use crate::simulator::MetricSimulator;
use crate::store::{self, StoreError, discovery, metrics, now_ms, servers};

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("server {0} not found")]
    ServerNotFound(i64),
    #[error("listing servers failed: {0}")]
    ListServers(#[source] StoreError),
    #[error("detail phase failed: {0}")]
    Details(#[source] StoreError),
    #[error("metrics phase failed: {0}")]
    Metrics(#[source] StoreError),
    #[error("transaction failed: {0}")]
    Transaction(#[source] StoreError),
    #[error("discovery timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Only servers whose `os_type` starts with this (case-insensitive). Empty = all.
    pub target_os_prefix: String,
    pub bands: MetricBands,
    /// Passes in flight at once; 1 = strictly sequential.
    pub concurrency: usize,
    pub pass_timeout: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            target_os_prefix: String::new(),
            bands: MetricBands::default(),
            concurrency: 1,
            pass_timeout: Duration::from_secs(30),
        }
    }
}

/// What a successful pass produced.
#[derive(Debug, Clone)]
pub struct PassSummary {
    pub detail: ServerDetail,
    pub sample: MetricSample,
    pub services_known: usize,
}

pub struct Discovery {
    pool: SqlitePool,
    details: DetailReconciler,
    simulator: Mutex<MetricSimulator>,
    status: StatusRecorder,
    locks: ServerLocks,
    config: DiscoveryConfig,
}

impl Discovery {
    pub fn new(
        pool: SqlitePool,
        details: DetailReconciler,
        simulator: MetricSimulator,
        config: DiscoveryConfig,
    ) -> Self {
        Self {
            status: StatusRecorder::new(pool.clone()),
            pool,
            details,
            simulator: Mutex::new(simulator),
            locks: ServerLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// One pass over every eligible server. Per-server failures are counted, not returned.
    #[instrument(skip(self), fields(operation = "run_batch", os_prefix = %self.config.target_os_prefix))]
    pub async fn run_batch(&self) -> Result<BatchReport, DiscoveryError> {
        let servers = self
            .eligible_servers()
            .await
            .map_err(DiscoveryError::ListServers)?;
        let total = servers.len();

        let outcomes: Vec<bool> = if self.config.concurrency <= 1 {
            let mut out = Vec::with_capacity(total);
            for server in &servers {
                out.push(self.run_pass(server).await);
            }
            out
        } else {
            futures_util::stream::iter(servers)
                .map(|server| async move { self.run_pass(&server).await }.boxed())
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await
        };

        let succeeded = outcomes.iter().filter(|ok| **ok).count();
        let report = BatchReport {
            total,
            succeeded,
            failed: total - succeeded,
        };
        info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            "discovery batch complete"
        );
        Ok(report)
    }

    /// Runs a pass for a single server now, regardless of the OS filter.
    pub async fn discover_one(&self, server_id: i64) -> Result<PassSummary, DiscoveryError> {
        let server = {
            let mut conn = self
                .pool
                .acquire()
                .await
                .map_err(|e| DiscoveryError::ListServers(e.into()))?;
            servers::get_server(&mut conn, server_id)
                .await
                .map_err(DiscoveryError::ListServers)?
        };
        let server = server.ok_or(DiscoveryError::ServerNotFound(server_id))?;
        let _guard = self.locks.lock(server.id).await;
        self.execute_pass(&server).await
    }

    /// Applies an inbound payload under the same per-server lock as simulated passes.
    pub async fn ingest(
        &self,
        server_id: i64,
        payload: &DiscoveryPayload,
    ) -> Result<IngestOutcome, IngestError> {
        let _guard = self.locks.lock(server_id).await;
        apply_payload(&self.pool, server_id, payload).await
    }

    async fn eligible_servers(&self) -> Result<Vec<Server>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        servers::list_eligible(&mut conn, &self.config.target_os_prefix).await
    }

    async fn run_pass(&self, server: &Server) -> bool {
        let _guard = self.locks.lock(server.id).await;
        self.execute_pass(server).await.is_ok()
    }

    /// Pass plus its terminal status write. The status recorder runs exactly once.
    async fn execute_pass(&self, server: &Server) -> Result<PassSummary, DiscoveryError> {
        let started_at = now_ms();
        let outcome =
            match tokio::time::timeout(self.config.pass_timeout, self.discover_server(server))
                .await
            {
                Ok(r) => r,
                Err(_) => Err(DiscoveryError::Timeout(self.config.pass_timeout)),
            };

        match &outcome {
            Ok(summary) => {
                debug!(
                    server_id = server.id,
                    cpu = summary.sample.cpu_usage,
                    memory = summary.sample.memory_usage,
                    disk = summary.sample.disk_usage,
                    "discovery pass succeeded"
                );
                self.status
                    .record_status(server.id, ServerStatus::Online, None)
                    .await;
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    server_id = server.id,
                    hostname = %server.hostname,
                    error = %message,
                    "discovery pass failed"
                );
                self.status
                    .record_failed_pass(server.id, started_at, &message)
                    .await;
                self.status
                    .record_status(server.id, ServerStatus::Error, Some(&message))
                    .await;
            }
        }
        outcome
    }

    #[instrument(skip(self, server), fields(server_id = server.id, operation = "discover_server"))]
    async fn discover_server(&self, server: &Server) -> Result<PassSummary, DiscoveryError> {
        let started_at = now_ms();
        let mut tx = store::begin_write(&self.pool)
            .await
            .map_err(|e| DiscoveryError::Transaction(e.into()))?;

        let detail = self
            .details
            .ensure_details(&mut tx, server.id)
            .await
            .map_err(DiscoveryError::Details)?;

        let services = match load_recent_services(&mut tx, server.id, RECENT_SERVICES_LIMIT).await
        {
            Ok(s) => s,
            Err(e) => {
                warn!(
                    server_id = server.id,
                    error = %e,
                    operation = "load_recent_services",
                    "service scan failed; continuing without services"
                );
                Vec::new()
            }
        };

        let previous = metrics::latest_metrics(&mut tx, server.id)
            .await
            .map_err(DiscoveryError::Metrics)?;
        let next = {
            let mut sim = self.simulator.lock().unwrap_or_else(|p| p.into_inner());
            sim.next_sample(previous.as_ref(), &self.config.bands)
        };
        let sample = MetricSample {
            server_id: server.id,
            cpu_usage: next.cpu_usage,
            memory_usage: next.memory_usage,
            disk_usage: next.disk_usage,
            recorded_at: now_ms(),
        };
        metrics::insert_metrics(&mut tx, &sample)
            .await
            .map_err(DiscoveryError::Metrics)?;

        let result = DiscoveryResult {
            server_id: server.id,
            success: true,
            message: Some(format!(
                "simulated sample recorded; {} services known",
                services.len()
            )),
            started_at,
            finished_at: now_ms(),
            os_name: Some(server.os_type.clone()),
            os_version: Some(detail.os_version.clone()),
            cpu_model: Some(detail.cpu_model.clone()),
            cpu_cores: Some(detail.cpu_cores),
            memory_total: Some(detail.memory_total),
            disk_total: Some(detail.disk_total),
            ..Default::default()
        };
        discovery::insert_result(&mut tx, &result)
            .await
            .map_err(DiscoveryError::Transaction)?;

        tx.commit()
            .await
            .map_err(|e| DiscoveryError::Transaction(e.into()))?;

        Ok(PassSummary {
            detail,
            sample,
            services_known: services.len(),
        })
    }
}
