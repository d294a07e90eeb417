// /api handlers: inventory reads, server registration, payload ingest, on-demand discovery

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Serialize;
use std::net::IpAddr;

use super::AppState;
use super::error::ApiError;
use crate::discovery::IngestOutcome;
use crate::models::{
    BatchReport, DiscoveryPayload, MetricSample, NewServer, OpenPort, Server, ServerDetail,
    ServiceRecord, Tag,
};
use crate::reconcile::{RECENT_SERVICES_LIMIT, load_recent_services};
use crate::store::stats::{self, FleetStats};
use crate::store::{details, discovery, metrics, servers, tags};

#[derive(Debug, Serialize)]
pub(super) struct ServerSummary {
    #[serde(flatten)]
    server: Server,
    latest_metrics: Option<MetricSample>,
}

#[derive(Debug, Serialize)]
pub(super) struct ServerView {
    #[serde(flatten)]
    server: Server,
    details: Option<ServerDetail>,
    latest_metrics: Option<MetricSample>,
    services: Vec<ServiceRecord>,
    tags: Vec<Tag>,
}

#[derive(Debug, Serialize)]
pub(super) struct PassView {
    server_id: i64,
    details: ServerDetail,
    sample: MetricSample,
    services_known: usize,
}

/// GET /api/stats
pub(super) async fn stats_handler(
    State(state): State<AppState>,
) -> Result<Json<FleetStats>, ApiError> {
    let mut conn = state.store.pool().acquire().await?;
    Ok(Json(stats::fleet_stats(&mut conn).await?))
}

/// GET /api/servers
pub(super) async fn list_servers_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ServerSummary>>, ApiError> {
    let mut conn = state.store.pool().acquire().await?;
    let all = servers::list_servers(&mut conn).await?;
    let mut latest = stats::latest_metrics_by_server(&mut conn).await?;
    let out = all
        .into_iter()
        .map(|server| ServerSummary {
            latest_metrics: latest.remove(&server.id),
            server,
        })
        .collect();
    Ok(Json(out))
}

/// POST /api/servers: register a server (starts `offline`).
pub(super) async fn create_server_handler(
    State(state): State<AppState>,
    body: Result<Json<NewServer>, JsonRejection>,
) -> Result<(StatusCode, Json<Server>), ApiError> {
    let Json(new) = body?;
    if new.hostname.trim().is_empty() {
        return Err(ApiError::BadRequest("hostname must be non-empty".into()));
    }
    if new.ip.parse::<IpAddr>().is_err() {
        return Err(ApiError::BadRequest(format!(
            "ip is not a valid address: {:?}",
            new.ip
        )));
    }
    let mut tx = state.store.pool().begin().await?;
    let server = servers::insert_server(&mut tx, &new).await?;
    tx.commit().await?;
    tracing::info!(server_id = server.id, hostname = %server.hostname, "server registered");
    Ok((StatusCode::CREATED, Json(server)))
}

/// GET /api/servers/{id}
pub(super) async fn get_server_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ServerView>, ApiError> {
    let mut conn = state.store.pool().acquire().await?;
    let server = servers::get_server(&mut conn, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("server {id} not found")))?;
    let details = details::get_details(&mut conn, id).await?;
    let latest_metrics = metrics::latest_metrics(&mut conn, id).await?;
    let services = load_recent_services(&mut conn, id, RECENT_SERVICES_LIMIT).await?;
    let tags = tags::tags_for_server(&mut conn, id).await?;
    Ok(Json(ServerView {
        server,
        details,
        latest_metrics,
        services,
        tags,
    }))
}

/// GET /api/servers/{id}/open-ports: ports from the latest discovery that recorded any.
pub(super) async fn open_ports_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<OpenPort>>, ApiError> {
    let mut conn = state.store.pool().acquire().await?;
    if servers::get_server(&mut conn, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("server {id} not found")));
    }
    Ok(Json(discovery::latest_open_ports(&mut conn, id).await?))
}

/// POST /api/servers/{id}/discovery: apply a collector payload.
pub(super) async fn ingest_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<IngestOutcome>, ApiError> {
    let Json(body) = body?;
    let payload = DiscoveryPayload::from_json(body)?;
    let outcome = state.discovery.ingest(id, &payload).await?;
    Ok(Json(outcome))
}

/// POST /api/servers/{id}/discover: run one simulated pass now.
pub(super) async fn discover_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PassView>, ApiError> {
    let summary = state.discovery.discover_one(id).await?;
    Ok(Json(PassView {
        server_id: id,
        details: summary.detail,
        sample: summary.sample,
        services_known: summary.services_known,
    }))
}

/// POST /api/discovery/run: run a batch now.
pub(super) async fn run_batch_handler(
    State(state): State<AppState>,
) -> Result<Json<BatchReport>, ApiError> {
    Ok(Json(state.discovery.run_batch().await?))
}
