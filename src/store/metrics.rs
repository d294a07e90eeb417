// server_metrics table: append-only usage samples

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::StoreError;
use crate::models::MetricSample;

/// Most recent sample for a server. Ties on `recorded_at` go to the highest row id.
pub async fn latest_metrics(
    conn: &mut SqliteConnection,
    server_id: i64,
) -> Result<Option<MetricSample>, StoreError> {
    let row = sqlx::query(
        "SELECT server_id, cpu_usage, memory_usage, disk_usage, recorded_at
         FROM server_metrics WHERE server_id = $1
         ORDER BY recorded_at DESC, id DESC LIMIT 1",
    )
    .bind(server_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(parse_metric_row).transpose()
}

pub async fn insert_metrics(
    conn: &mut SqliteConnection,
    sample: &MetricSample,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO server_metrics (server_id, cpu_usage, memory_usage, disk_usage, recorded_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(sample.server_id)
    .bind(sample.cpu_usage)
    .bind(sample.memory_usage)
    .bind(sample.disk_usage)
    .bind(sample.recorded_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn count_metrics(conn: &mut SqliteConnection, server_id: i64) -> Result<i64, StoreError> {
    let n: i64 = sqlx::query("SELECT COUNT(*) AS n FROM server_metrics WHERE server_id = $1")
        .bind(server_id)
        .fetch_one(&mut *conn)
        .await?
        .try_get("n")?;
    Ok(n)
}

pub(super) fn parse_metric_row(row: &SqliteRow) -> Result<MetricSample, StoreError> {
    Ok(MetricSample {
        server_id: row.try_get("server_id")?,
        cpu_usage: row.try_get("cpu_usage")?,
        memory_usage: row.try_get("memory_usage")?,
        disk_usage: row.try_get("disk_usage")?,
        recorded_at: row.try_get("recorded_at")?,
    })
}
