// servers table: inventory rows, eligibility filter, status writes

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{StoreError, tags};
use crate::models::{NewServer, Server, ServerStatus};

const SERVER_COLUMNS: &str = "id, hostname, ip, os_type, region, status, last_checked, last_error";

pub async fn get_server(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Server>, StoreError> {
    let row = sqlx::query(&format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    row.as_ref().map(parse_server_row).transpose()
}

pub async fn list_servers(conn: &mut SqliteConnection) -> Result<Vec<Server>, StoreError> {
    let rows = sqlx::query(&format!("SELECT {SERVER_COLUMNS} FROM servers ORDER BY id"))
        .fetch_all(&mut *conn)
        .await?;
    rows.iter().map(parse_server_row).collect()
}

/// Servers whose `os_type` starts with `os_prefix` (case-insensitive). Empty prefix = all.
pub async fn list_eligible(
    conn: &mut SqliteConnection,
    os_prefix: &str,
) -> Result<Vec<Server>, StoreError> {
    let pattern = format!("{}%", escape_like(&os_prefix.to_lowercase()));
    let rows = sqlx::query(&format!(
        "SELECT {SERVER_COLUMNS} FROM servers WHERE lower(os_type) LIKE $1 ESCAPE '\\' ORDER BY id"
    ))
    .bind(pattern)
    .fetch_all(&mut *conn)
    .await?;
    rows.iter().map(parse_server_row).collect()
}

/// Inserts a server (status `offline`) and its tags. Caller decides the transaction scope.
pub async fn insert_server(
    conn: &mut SqliteConnection,
    new: &NewServer,
) -> Result<Server, StoreError> {
    let id: i64 = sqlx::query(
        "INSERT INTO servers (hostname, ip, os_type, region, status) VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&new.hostname)
    .bind(&new.ip)
    .bind(&new.os_type)
    .bind(&new.region)
    .bind(ServerStatus::Offline.as_str())
    .fetch_one(&mut *conn)
    .await?
    .try_get("id")?;

    for tag in &new.tags {
        tags::insert_tag(&mut *conn, id, tag).await?;
    }

    Ok(Server {
        id,
        hostname: new.hostname.clone(),
        ip: new.ip.clone(),
        os_type: new.os_type.clone(),
        region: new.region.clone(),
        status: ServerStatus::Offline,
        last_checked: None,
        last_error: None,
    })
}

/// Writes status, check time and last error. Returns false when no such server exists.
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ServerStatus,
    error: Option<&str>,
    checked_at: i64,
) -> Result<bool, StoreError> {
    let r = sqlx::query(
        "UPDATE servers SET status = $1, last_checked = $2, last_error = $3 WHERE id = $4",
    )
    .bind(status.as_str())
    .bind(checked_at)
    .bind(error)
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(r.rows_affected() > 0)
}

fn parse_server_row(row: &SqliteRow) -> Result<Server, StoreError> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ServerStatus>().map_err(StoreError::InvalidRow)?;
    Ok(Server {
        id: row.try_get("id")?,
        hostname: row.try_get("hostname")?,
        ip: row.try_get("ip")?,
        os_type: row.try_get("os_type")?,
        region: row.try_get("region")?,
        status,
        last_checked: row.try_get("last_checked")?,
        last_error: row.try_get("last_error")?,
    })
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
