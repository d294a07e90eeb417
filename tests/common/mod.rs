// Shared test helpers: temp store, fixtures, failure injection via SQLite triggers

#![allow(dead_code)]

use serverwatch::discovery::{Discovery, DiscoveryConfig};
use serverwatch::models::{NewServer, Server, ServerStatus};
use serverwatch::reconcile::{DetailReconciler, HardwareCatalog};
use serverwatch::simulator::MetricSimulator;
use serverwatch::store::{Store, servers};
use sqlx::Row;
use std::sync::Arc;
use tempfile::TempDir;

/// Fresh, initialised store in a temp dir. Keep the `TempDir` alive for the test.
pub async fn test_store() -> (TempDir, Arc<Store>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("serverwatch.db");
    let store = Store::connect(path.to_str().unwrap(), 4, 7).await.unwrap();
    store.init().await.unwrap();
    (dir, Arc::new(store))
}

pub fn new_server(hostname: &str, os_type: &str) -> NewServer {
    NewServer {
        hostname: hostname.into(),
        ip: "10.0.0.1".into(),
        os_type: os_type.into(),
        region: "eu-west".into(),
        tags: vec![],
    }
}

pub async fn add_server(store: &Store, hostname: &str, os_type: &str) -> Server {
    let mut conn = store.pool().acquire().await.unwrap();
    servers::insert_server(&mut conn, &new_server(hostname, os_type))
        .await
        .unwrap()
}

/// Inserts a server with a fixed id.
pub async fn add_server_with_id(store: &Store, id: i64, os_type: &str) {
    sqlx::query("INSERT INTO servers (id, hostname, ip, os_type, region) VALUES ($1, $2, $3, $4, $5)")
        .bind(id)
        .bind(format!("host-{id}"))
        .bind("10.0.0.7")
        .bind(os_type)
        .bind("us-east")
        .execute(store.pool())
        .await
        .unwrap();
}

pub fn discovery(store: &Store, config: DiscoveryConfig) -> Discovery {
    Discovery::new(
        store.pool().clone(),
        DetailReconciler::new(Arc::new(HardwareCatalog::default())),
        MetricSimulator::seeded(1234),
        config,
    )
}

pub async fn get_server(store: &Store, id: i64) -> Server {
    let mut conn = store.pool().acquire().await.unwrap();
    servers::get_server(&mut conn, id).await.unwrap().unwrap()
}

pub async fn status_of(store: &Store, id: i64) -> ServerStatus {
    get_server(store, id).await.status
}

pub async fn count(store: &Store, table: &str, server_id: i64) -> i64 {
    sqlx::query(&format!("SELECT COUNT(*) AS n FROM {table} WHERE server_id = $1"))
        .bind(server_id)
        .fetch_one(store.pool())
        .await
        .unwrap()
        .get("n")
}

/// Makes every INSERT into `table` fail, as a store outage would.
pub async fn fail_inserts_into(store: &Store, table: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER fail_insert_{table} BEFORE INSERT ON {table}
         BEGIN SELECT RAISE(ABORT, 'simulated store outage'); END"
    ))
    .execute(store.pool())
    .await
    .unwrap();
}

/// Makes INSERTs into `table` fail only for one server.
pub async fn fail_inserts_for(store: &Store, table: &str, server_id: i64) {
    sqlx::query(&format!(
        "CREATE TRIGGER fail_insert_{table}_{server_id} BEFORE INSERT ON {table}
         WHEN NEW.server_id = {server_id}
         BEGIN SELECT RAISE(ABORT, 'simulated store outage'); END"
    ))
    .execute(store.pool())
    .await
    .unwrap();
}
