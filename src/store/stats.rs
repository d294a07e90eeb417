// Fleet-wide read queries for the API

use serde::{Deserialize, Serialize};
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;

use super::StoreError;
use super::metrics::parse_metric_row;
use crate::models::MetricSample;

const LATEST_SAMPLE_FILTER: &str = "m.id = (
    SELECT m2.id FROM server_metrics m2 WHERE m2.server_id = m.server_id
    ORDER BY m2.recorded_at DESC, m2.id DESC LIMIT 1
)";

/// Status counts plus averages over each server's latest sample (`None` with no samples).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetStats {
    pub total_servers: i64,
    pub online: i64,
    pub offline: i64,
    pub error: i64,
    pub avg_cpu_usage: Option<f64>,
    pub avg_memory_usage: Option<f64>,
    pub avg_disk_usage: Option<f64>,
}

pub async fn fleet_stats(conn: &mut SqliteConnection) -> Result<FleetStats, StoreError> {
    let counts = sqlx::query(
        "SELECT COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'online' THEN 1 ELSE 0 END), 0) AS online,
                COALESCE(SUM(CASE WHEN status = 'offline' THEN 1 ELSE 0 END), 0) AS offline,
                COALESCE(SUM(CASE WHEN status = 'error' THEN 1 ELSE 0 END), 0) AS error
         FROM servers",
    )
    .fetch_one(&mut *conn)
    .await?;

    let averages = sqlx::query(&format!(
        "SELECT AVG(m.cpu_usage) AS cpu, AVG(m.memory_usage) AS memory, AVG(m.disk_usage) AS disk
         FROM server_metrics m WHERE {LATEST_SAMPLE_FILTER}"
    ))
    .fetch_one(&mut *conn)
    .await?;

    Ok(FleetStats {
        total_servers: counts.try_get("total")?,
        online: counts.try_get("online")?,
        offline: counts.try_get("offline")?,
        error: counts.try_get("error")?,
        avg_cpu_usage: averages.try_get("cpu")?,
        avg_memory_usage: averages.try_get("memory")?,
        avg_disk_usage: averages.try_get("disk")?,
    })
}

/// Latest sample of every server that has one, keyed by server id.
pub async fn latest_metrics_by_server(
    conn: &mut SqliteConnection,
) -> Result<HashMap<i64, MetricSample>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT m.server_id, m.cpu_usage, m.memory_usage, m.disk_usage, m.recorded_at
         FROM server_metrics m WHERE {LATEST_SAMPLE_FILTER}"
    ))
    .fetch_all(&mut *conn)
    .await?;
    let mut out = HashMap::with_capacity(rows.len());
    for row in &rows {
        let sample = parse_metric_row(row)?;
        out.insert(sample.server_id, sample);
    }
    Ok(out)
}
