// server_details table: one row per server, keyed by server_id

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::StoreError;
use crate::models::ServerDetail;

pub async fn get_details(
    conn: &mut SqliteConnection,
    server_id: i64,
) -> Result<Option<ServerDetail>, StoreError> {
    let row = sqlx::query(
        "SELECT server_id, cpu_model, cpu_cores, memory_total, disk_total, os_version
         FROM server_details WHERE server_id = $1",
    )
    .bind(server_id)
    .fetch_optional(&mut *conn)
    .await?;
    row.as_ref().map(parse_detail_row).transpose()
}

/// Inserts unless a row for the server already exists. Returns whether this call inserted.
pub async fn insert_details_if_absent(
    conn: &mut SqliteConnection,
    detail: &ServerDetail,
) -> Result<bool, StoreError> {
    let r = sqlx::query(
        "INSERT INTO server_details (server_id, cpu_model, cpu_cores, memory_total, disk_total, os_version)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT(server_id) DO NOTHING",
    )
    .bind(detail.server_id)
    .bind(&detail.cpu_model)
    .bind(detail.cpu_cores)
    .bind(detail.memory_total)
    .bind(detail.disk_total)
    .bind(&detail.os_version)
    .execute(&mut *conn)
    .await?;
    Ok(r.rows_affected() == 1)
}

fn parse_detail_row(row: &SqliteRow) -> Result<ServerDetail, StoreError> {
    Ok(ServerDetail {
        server_id: row.try_get("server_id")?,
        cpu_model: row.try_get("cpu_model")?,
        cpu_cores: row.try_get("cpu_cores")?,
        memory_total: row.try_get("memory_total")?,
        disk_total: row.try_get("disk_total")?,
        os_version: row.try_get("os_version")?,
    })
}
