// server_services table: service snapshots, newest first on read

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::StoreError;
use crate::models::ServiceRecord;

pub async fn recent_services(
    conn: &mut SqliteConnection,
    server_id: i64,
    limit: u32,
) -> Result<Vec<ServiceRecord>, StoreError> {
    let rows = sqlx::query(
        "SELECT server_id, service_name, service_status, last_checked
         FROM server_services WHERE server_id = $1
         ORDER BY last_checked DESC, id DESC LIMIT $2",
    )
    .bind(server_id)
    .bind(limit as i64)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_service_row).collect()
}

pub async fn insert_service(
    conn: &mut SqliteConnection,
    record: &ServiceRecord,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO server_services (server_id, service_name, service_status, last_checked)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(record.server_id)
    .bind(&record.service_name)
    .bind(&record.service_status)
    .bind(record.last_checked)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn parse_service_row(row: &SqliteRow) -> Result<ServiceRecord, StoreError> {
    Ok(ServiceRecord {
        server_id: row.try_get("server_id")?,
        service_name: row.try_get("service_name")?,
        service_status: row.try_get("service_status")?,
        last_checked: row.try_get("last_checked")?,
    })
}
