// Integration tests: HTTP endpoints against a temp store

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::*;
use serde_json::{Value, json};
use serverwatch::discovery::DiscoveryConfig;
use serverwatch::routes;
use serverwatch::store::Store;
use std::sync::Arc;
use tempfile::TempDir;

async fn test_server() -> (TempDir, Arc<Store>, TestServer) {
    let (dir, store) = test_store().await;
    let discovery = Arc::new(discovery(&store, DiscoveryConfig::default()));
    let app = routes::app(store.clone(), discovery);
    let server = TestServer::new(app);
    (dir, store, server)
}

async fn register(server: &TestServer, hostname: &str) -> i64 {
    let response = server
        .post("/api/servers")
        .json(&json!({
            "hostname": hostname,
            "ip": "192.168.1.20",
            "os_type": "linux",
            "region": "eu-west",
            "tags": [{"name": "env", "value": "prod"}]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    let (_dir, _store, server) = test_server().await;
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("serverwatch: ok");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (_dir, _store, server) = test_server().await;
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(
        json.get("name").and_then(|v| v.as_str()),
        Some("serverwatch")
    );
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_register_and_fetch_server() {
    let (_dir, _store, server) = test_server().await;
    let id = register(&server, "web-1").await;

    let response = server.get(&format!("/api/servers/{id}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["hostname"], "web-1");
    assert_eq!(body["status"], "offline");
    assert!(body["details"].is_null());
    assert!(body["latest_metrics"].is_null());
    assert_eq!(body["tags"][0]["value"], "prod");

    let list: Value = server.get("/api/servers").await.json();
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_register_rejects_bad_ip() {
    let (_dir, _store, server) = test_server().await;
    let response = server
        .post("/api/servers")
        .json(&json!({"hostname": "web-1", "ip": "not-an-ip", "os_type": "linux"}))
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("ip"));
}

#[tokio::test]
async fn test_unknown_server_is_404() {
    let (_dir, _store, server) = test_server().await;
    server.get("/api/servers/42").await.assert_status_not_found();
    server
        .get("/api/servers/42/open-ports")
        .await
        .assert_status_not_found();
    server
        .post("/api/servers/42/discover")
        .await
        .assert_status_not_found();
    server
        .post("/api/servers/42/discovery")
        .json(&json!({}))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn test_discover_endpoint_runs_a_pass() {
    let (_dir, _store, server) = test_server().await;
    let id = register(&server, "web-1").await;

    let response = server.post(&format!("/api/servers/{id}/discover")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["server_id"], id);
    assert_eq!(body["sample"]["cpu_usage"], 60.0);

    let view: Value = server.get(&format!("/api/servers/{id}")).await.json();
    assert_eq!(view["status"], "online");
    assert!(view["details"]["cpu_model"].is_string());
    assert!(view["latest_metrics"].is_object());
}

#[tokio::test]
async fn test_ingest_endpoint_records_ports() {
    let (_dir, _store, server) = test_server().await;
    let id = register(&server, "db-1").await;

    let response = server
        .post(&format!("/api/servers/{id}/discovery"))
        .json(&json!({
            "cpu": {"usage": 12.5},
            "memory": {"total": 0, "used": 5},
            "services": [{"name": "postgres", "status": "running"}],
            "ports": [{"local_port": 5432, "local_ip": "0.0.0.0", "state": "LISTEN"}]
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["sample"]["cpu_usage"], 12.5);
    assert_eq!(body["sample"]["memory_usage"], 0.0);
    assert_eq!(body["ports_recorded"], 1);

    let ports: Value = server
        .get(&format!("/api/servers/{id}/open-ports"))
        .await
        .json();
    assert_eq!(ports[0]["local_port"], 5432);

    let view: Value = server.get(&format!("/api/servers/{id}")).await.json();
    assert_eq!(view["services"][0]["service_name"], "postgres");
}

#[tokio::test]
async fn test_ingest_rejects_non_object_payload() {
    let (_dir, _store, server) = test_server().await;
    let id = register(&server, "db-1").await;
    let response = server
        .post(&format!("/api/servers/{id}/discovery"))
        .json(&json!([1, 2, 3]))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_invalid_json_body_gets_json_error() {
    let (_dir, _store, server) = test_server().await;
    let id = register(&server, "db-1").await;

    let response = server
        .post(&format!("/api/servers/{id}/discovery"))
        .bytes("{\"cpu\": ".into())
        .content_type("application/json")
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].is_string());

    let response = server
        .post("/api/servers")
        .bytes("not json".into())
        .content_type("application/json")
        .await;
    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_ingest_store_failure_is_500_and_leaves_status() {
    let (_dir, store, server) = test_server().await;
    let id = register(&server, "db-1").await;
    fail_inserts_into(&store, "server_services").await;

    let response = server
        .post(&format!("/api/servers/{id}/discovery"))
        .json(&json!({"services": [{"name": "nginx"}]}))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("insert_services"));

    let view: Value = server.get(&format!("/api/servers/{id}")).await.json();
    assert_eq!(view["status"], "offline");
    assert!(view["latest_metrics"].is_null());
}

#[tokio::test]
async fn test_run_batch_and_stats() {
    let (_dir, _store, server) = test_server().await;
    register(&server, "web-1").await;
    register(&server, "web-2").await;

    let response = server.post("/api/discovery/run").await;
    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["total"], 2);
    assert_eq!(report["succeeded"], 2);

    let stats: Value = server.get("/api/stats").await.json();
    assert_eq!(stats["total_servers"], 2);
    assert_eq!(stats["online"], 2);
    assert!(stats["avg_cpu_usage"].is_number());
}
