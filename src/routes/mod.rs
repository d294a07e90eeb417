// HTTP routes

mod api;
mod error;
mod http;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::discovery::Discovery;
use crate::store::Store;

pub use error::ApiError;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<Store>,
    pub(crate) discovery: Arc<Discovery>,
}

pub fn app(store: Arc<Store>, discovery: Arc<Discovery>) -> Router {
    let state = AppState { store, discovery };
    Router::new()
        .route("/", get(|| async { "serverwatch: ok" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/stats", get(api::stats_handler)) // GET /api/stats
        .route(
            "/api/servers",
            get(api::list_servers_handler).post(api::create_server_handler),
        ) // GET, POST /api/servers
        .route("/api/servers/{id}", get(api::get_server_handler)) // GET /api/servers/{id}
        .route("/api/servers/{id}/open-ports", get(api::open_ports_handler))
        .route("/api/servers/{id}/discovery", post(api::ingest_handler))
        .route("/api/servers/{id}/discover", post(api::discover_handler))
        .route("/api/discovery/run", post(api::run_batch_handler))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
