// discovery_results + open_ports: per-pass audit rows and the ports seen in each pass

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::StoreError;
use crate::models::{DiscoveryResult, OpenPort};

/// Inserts the audit row; `result.id` is ignored. Returns the new id.
pub async fn insert_result(
    conn: &mut SqliteConnection,
    result: &DiscoveryResult,
) -> Result<i64, StoreError> {
    let id: i64 = sqlx::query(
        "INSERT INTO discovery_results
            (server_id, success, message, error, started_at, finished_at,
             os_name, os_version, cpu_model, cpu_cores, memory_total, disk_total, boot_time)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING id",
    )
    .bind(result.server_id)
    .bind(result.success)
    .bind(&result.message)
    .bind(&result.error)
    .bind(result.started_at)
    .bind(result.finished_at)
    .bind(&result.os_name)
    .bind(&result.os_version)
    .bind(&result.cpu_model)
    .bind(result.cpu_cores)
    .bind(result.memory_total)
    .bind(result.disk_total)
    .bind(result.boot_time)
    .fetch_one(&mut *conn)
    .await?
    .try_get("id")?;
    Ok(id)
}

pub async fn insert_port(
    conn: &mut SqliteConnection,
    discovery_id: i64,
    port: &OpenPort,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO open_ports
            (discovery_id, local_port, local_ip, remote_port, remote_ip, state,
             description, process_id, process_name)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(discovery_id)
    .bind(port.local_port)
    .bind(&port.local_ip)
    .bind(port.remote_port)
    .bind(&port.remote_ip)
    .bind(&port.state)
    .bind(&port.description)
    .bind(port.process_id)
    .bind(&port.process_name)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn recent_results(
    conn: &mut SqliteConnection,
    server_id: i64,
    limit: u32,
) -> Result<Vec<DiscoveryResult>, StoreError> {
    let rows = sqlx::query(
        "SELECT id, server_id, success, message, error, started_at, finished_at,
                os_name, os_version, cpu_model, cpu_cores, memory_total, disk_total, boot_time
         FROM discovery_results WHERE server_id = $1
         ORDER BY id DESC LIMIT $2",
    )
    .bind(server_id)
    .bind(limit as i64)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_result_row).collect()
}

/// Ports of the newest discovery result that recorded any ports.
pub async fn latest_open_ports(
    conn: &mut SqliteConnection,
    server_id: i64,
) -> Result<Vec<OpenPort>, StoreError> {
    let rows = sqlx::query(
        "SELECT local_port, local_ip, remote_port, remote_ip, state, description, process_id, process_name
         FROM open_ports
         WHERE discovery_id = (
             SELECT MAX(p.discovery_id) FROM open_ports p
             JOIN discovery_results d ON d.id = p.discovery_id
             WHERE d.server_id = $1
         )
         ORDER BY local_port, id",
    )
    .bind(server_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_port_row).collect()
}

fn parse_result_row(row: &SqliteRow) -> Result<DiscoveryResult, StoreError> {
    Ok(DiscoveryResult {
        id: row.try_get("id")?,
        server_id: row.try_get("server_id")?,
        success: row.try_get("success")?,
        message: row.try_get("message")?,
        error: row.try_get("error")?,
        started_at: row.try_get("started_at")?,
        finished_at: row.try_get("finished_at")?,
        os_name: row.try_get("os_name")?,
        os_version: row.try_get("os_version")?,
        cpu_model: row.try_get("cpu_model")?,
        cpu_cores: row.try_get("cpu_cores")?,
        memory_total: row.try_get("memory_total")?,
        disk_total: row.try_get("disk_total")?,
        boot_time: row.try_get("boot_time")?,
    })
}

fn parse_port_row(row: &SqliteRow) -> Result<OpenPort, StoreError> {
    Ok(OpenPort {
        local_port: row.try_get("local_port")?,
        local_ip: row.try_get("local_ip")?,
        remote_port: row.try_get("remote_port")?,
        remote_ip: row.try_get("remote_ip")?,
        state: row.try_get("state")?,
        description: row.try_get("description")?,
        process_id: row.try_get("process_id")?,
        process_name: row.try_get("process_name")?,
    })
}
