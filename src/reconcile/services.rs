// Service/port reconciler: reads recent service snapshots, merges newly observed ones,
// and attaches observed ports to a discovery result.

use sqlx::SqliteConnection;
use std::collections::HashMap;

use crate::models::{ObservedService, OpenPort, ServiceRecord};
use crate::store::{StoreError, discovery, services};

/// How many service rows the read side returns per server.
pub const RECENT_SERVICES_LIMIT: u32 = 10;

/// Newest first by check time, ties broken by insertion order.
pub async fn load_recent_services(
    conn: &mut SqliteConnection,
    server_id: i64,
    limit: u32,
) -> Result<Vec<ServiceRecord>, StoreError> {
    services::recent_services(conn, server_id, limit).await
}

/// One entry per service name, first-seen order, last report wins. Blank names are dropped;
/// a blank status becomes "unknown".
pub fn dedupe_observed(observed: &[ObservedService]) -> Vec<ObservedService> {
    let mut order: Vec<String> = Vec::new();
    let mut latest: HashMap<String, String> = HashMap::new();
    for svc in observed {
        let name = svc.name.trim();
        if name.is_empty() {
            continue;
        }
        let status = match svc.status.trim() {
            "" => "unknown",
            s => s,
        };
        if latest.insert(name.to_string(), status.to_string()).is_none() {
            order.push(name.to_string());
        }
    }
    order
        .into_iter()
        .filter_map(|name| {
            let status = latest.remove(&name)?;
            Some(ObservedService { name, status })
        })
        .collect()
}

/// Appends one snapshot row per distinct observed service. Returns rows inserted.
pub async fn merge_observed(
    conn: &mut SqliteConnection,
    server_id: i64,
    observed: &[ObservedService],
    checked_at: i64,
) -> Result<usize, StoreError> {
    let distinct = dedupe_observed(observed);
    for svc in &distinct {
        services::insert_service(
            &mut *conn,
            &ServiceRecord {
                server_id,
                service_name: svc.name.clone(),
                service_status: svc.status.clone(),
                last_checked: checked_at,
            },
        )
        .await?;
    }
    Ok(distinct.len())
}

pub async fn record_ports(
    conn: &mut SqliteConnection,
    discovery_id: i64,
    ports: &[OpenPort],
) -> Result<usize, StoreError> {
    for port in ports {
        discovery::insert_port(&mut *conn, discovery_id, port).await?;
    }
    Ok(ports.len())
}
