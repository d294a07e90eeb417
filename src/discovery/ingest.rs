// Update path: apply an externally collected discovery payload in one transaction.
// Metrics, services, the audit row, its ports and the status flip commit together or not
// at all; the transaction rolls back on drop for every early return.

use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::models::{DiscoveryPayload, DiscoveryResult, MetricSample, ServerStatus};
use crate::reconcile::{merge_observed, record_ports};
use crate::store::{StoreError, begin_write, discovery, metrics, now_ms, servers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStep {
    Begin,
    LoadServer,
    InsertMetrics,
    InsertServices,
    InsertDiscovery,
    InsertPorts,
    UpdateStatus,
    Commit,
}

impl fmt::Display for IngestStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IngestStep::Begin => "begin",
            IngestStep::LoadServer => "load_server",
            IngestStep::InsertMetrics => "insert_metrics",
            IngestStep::InsertServices => "insert_services",
            IngestStep::InsertDiscovery => "insert_discovery",
            IngestStep::InsertPorts => "insert_ports",
            IngestStep::UpdateStatus => "update_status",
            IngestStep::Commit => "commit",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("server {0} not found")]
    ServerNotFound(i64),
    #[error("ingest failed at {step}: {source}")]
    Step {
        step: IngestStep,
        #[source]
        source: StoreError,
    },
}

fn at<E: Into<StoreError>>(step: IngestStep) -> impl FnOnce(E) -> IngestError {
    move |e| IngestError::Step {
        step,
        source: e.into(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub discovery_id: i64,
    pub sample: MetricSample,
    pub services_recorded: usize,
    pub ports_recorded: usize,
    /// Payload sections that were unreadable and defaulted.
    pub issues: Vec<String>,
}

#[instrument(skip(pool, payload), fields(operation = "apply_payload"))]
pub async fn apply_payload(
    pool: &SqlitePool,
    server_id: i64,
    payload: &DiscoveryPayload,
) -> Result<IngestOutcome, IngestError> {
    for issue in &payload.issues {
        warn!(server_id, issue = %issue, "discovery payload section ignored");
    }

    let started_at = now_ms();
    let mut tx = begin_write(pool).await.map_err(at(IngestStep::Begin))?;

    let server = servers::get_server(&mut tx, server_id)
        .await
        .map_err(at(IngestStep::LoadServer))?
        .ok_or(IngestError::ServerNotFound(server_id))?;

    let checked_at = now_ms();
    let sample = MetricSample {
        server_id,
        cpu_usage: payload.cpu_usage(),
        memory_usage: payload.memory_usage(),
        disk_usage: payload.disk_usage(),
        recorded_at: checked_at,
    };
    metrics::insert_metrics(&mut tx, &sample)
        .await
        .map_err(at(IngestStep::InsertMetrics))?;

    let services_recorded = merge_observed(&mut tx, server_id, &payload.services, checked_at)
        .await
        .map_err(at(IngestStep::InsertServices))?;

    let cpu = payload.cpu.as_ref();
    let os = payload.os.as_ref();
    let result = DiscoveryResult {
        server_id,
        success: true,
        message: Some(format!(
            "ingested {} services, {} ports",
            services_recorded,
            payload.ports.len()
        )),
        started_at,
        finished_at: now_ms(),
        os_name: os
            .and_then(|o| o.name.clone())
            .or_else(|| Some(server.os_type.clone())),
        os_version: os.and_then(|o| o.version.clone()),
        cpu_model: cpu.and_then(|c| c.model.clone()),
        cpu_cores: cpu.and_then(|c| c.cores),
        memory_total: payload.memory_total(),
        disk_total: payload.disk_total(),
        boot_time: payload.boot_time,
        ..Default::default()
    };
    let discovery_id = discovery::insert_result(&mut tx, &result)
        .await
        .map_err(at(IngestStep::InsertDiscovery))?;

    let ports_recorded = record_ports(&mut tx, discovery_id, &payload.ports)
        .await
        .map_err(at(IngestStep::InsertPorts))?;

    servers::set_status(&mut tx, server_id, ServerStatus::Online, None, checked_at)
        .await
        .map_err(at(IngestStep::UpdateStatus))?;

    tx.commit().await.map_err(at(IngestStep::Commit))?;

    debug!(
        server_id,
        discovery_id, services_recorded, ports_recorded, "discovery payload applied"
    );
    Ok(IngestOutcome {
        discovery_id,
        sample,
        services_recorded,
        ports_recorded,
        issues: payload.issues.clone(),
    })
}
