// Store tests: query helpers, ordering rules, retention pruning

mod common;

use common::*;
use serverwatch::models::{
    DiscoveryResult, MetricSample, NewServer, OpenPort, ServerDetail, ServerStatus, ServiceRecord,
    Tag,
};
use serverwatch::reconcile::{DetailReconciler, HardwareCatalog};
use serverwatch::store::{
    details, discovery as audit, metrics, now_ms, servers, services, stats, tags,
};
use std::sync::Arc;

fn sample(server_id: i64, cpu: f64, recorded_at: i64) -> MetricSample {
    MetricSample {
        server_id,
        cpu_usage: cpu,
        memory_usage: 50.0,
        disk_usage: 50.0,
        recorded_at,
    }
}

#[tokio::test]
async fn init_is_idempotent() {
    let (_dir, store) = test_store().await;
    store.init().await.unwrap();
    store.init().await.unwrap();
    let server = add_server(&store, "web-1", "linux").await;
    assert_eq!(server.status, ServerStatus::Offline);
}

#[tokio::test]
async fn insert_server_stores_tags() {
    let (_dir, store) = test_store().await;
    let mut conn = store.pool().acquire().await.unwrap();
    let new = NewServer {
        tags: vec![
            Tag {
                name: "env".into(),
                value: "prod".into(),
            },
            Tag {
                name: "team".into(),
                value: "payments".into(),
            },
        ],
        ..new_server("pay-1", "linux")
    };
    let server = servers::insert_server(&mut conn, &new).await.unwrap();
    let stored = tags::tags_for_server(&mut conn, server.id).await.unwrap();
    assert_eq!(stored, new.tags);
}

#[tokio::test]
async fn latest_metrics_breaks_timestamp_ties_by_insertion_order() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();

    assert!(metrics::latest_metrics(&mut conn, server.id).await.unwrap().is_none());

    metrics::insert_metrics(&mut conn, &sample(server.id, 10.0, 1_000)).await.unwrap();
    metrics::insert_metrics(&mut conn, &sample(server.id, 20.0, 1_000)).await.unwrap();
    metrics::insert_metrics(&mut conn, &sample(server.id, 99.0, 500)).await.unwrap();

    let latest = metrics::latest_metrics(&mut conn, server.id).await.unwrap().unwrap();
    assert_eq!(latest.cpu_usage, 20.0);
    assert_eq!(metrics::count_metrics(&mut conn, server.id).await.unwrap(), 3);
}

#[tokio::test]
async fn recent_services_are_newest_first_and_limited() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();

    for i in 0..15 {
        services::insert_service(
            &mut conn,
            &ServiceRecord {
                server_id: server.id,
                service_name: format!("svc-{i}"),
                service_status: "running".into(),
                last_checked: 1_000 + i,
            },
        )
        .await
        .unwrap();
    }

    let recent = services::recent_services(&mut conn, server.id, 10).await.unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0].service_name, "svc-14");
    assert_eq!(recent[9].service_name, "svc-5");
}

#[tokio::test]
async fn details_insert_only_once() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();

    let first = ServerDetail {
        server_id: server.id,
        cpu_model: "Intel Xeon E5-2680".into(),
        cpu_cores: 8,
        memory_total: 16,
        disk_total: 256,
        os_version: "Ubuntu 22.04".into(),
    };
    let second = ServerDetail {
        cpu_model: "other".into(),
        ..first.clone()
    };
    assert!(details::insert_details_if_absent(&mut conn, &first).await.unwrap());
    assert!(!details::insert_details_if_absent(&mut conn, &second).await.unwrap());

    let stored = details::get_details(&mut conn, server.id).await.unwrap().unwrap();
    assert_eq!(stored, first);
}

#[tokio::test]
async fn ensure_details_seeds_once_and_returns_the_same_record() {
    let (_dir, store) = test_store().await;
    add_server_with_id(&store, 11, "linux").await;
    let catalog = Arc::new(HardwareCatalog::default());
    let reconciler = DetailReconciler::new(catalog.clone());
    let mut conn = store.pool().acquire().await.unwrap();

    let first = reconciler.ensure_details(&mut conn, 11).await.unwrap();
    let second = reconciler.ensure_details(&mut conn, 11).await.unwrap();
    drop(conn);

    assert_eq!(first, second);
    assert_eq!(first, catalog.synthesize(11));
    assert_eq!(count(&store, "server_details", 11).await, 1);
}

#[tokio::test]
async fn eligible_filter_is_case_insensitive_prefix_with_literal_wildcards() {
    let (_dir, store) = test_store().await;
    let ubuntu = add_server(&store, "a", "Linux Ubuntu").await;
    add_server(&store, "b", "windows").await;
    let odd = add_server(&store, "c", "lin_x").await;
    let mut conn = store.pool().acquire().await.unwrap();

    let linux: Vec<i64> = servers::list_eligible(&mut conn, "LINUX")
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(linux, vec![ubuntu.id]);

    let underscore: Vec<i64> = servers::list_eligible(&mut conn, "lin_")
        .await
        .unwrap()
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(underscore, vec![odd.id]);

    assert_eq!(servers::list_eligible(&mut conn, "").await.unwrap().len(), 3);
}

#[tokio::test]
async fn set_status_reports_missing_server() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();

    let updated = servers::set_status(&mut conn, server.id, ServerStatus::Error, Some("boom"), 42)
        .await
        .unwrap();
    assert!(updated);
    let row = servers::get_server(&mut conn, server.id).await.unwrap().unwrap();
    assert_eq!(row.status, ServerStatus::Error);
    assert_eq!(row.last_error.as_deref(), Some("boom"));
    assert_eq!(row.last_checked, Some(42));

    let missing = servers::set_status(&mut conn, 999, ServerStatus::Online, None, 42)
        .await
        .unwrap();
    assert!(!missing);
}

#[tokio::test]
async fn latest_open_ports_come_from_newest_result_with_ports() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();

    let result = DiscoveryResult {
        server_id: server.id,
        success: true,
        started_at: 1,
        finished_at: 2,
        ..Default::default()
    };
    let old = audit::insert_result(&mut conn, &result).await.unwrap();
    audit::insert_port(
        &mut conn,
        old,
        &OpenPort {
            local_port: 8080,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let new = audit::insert_result(&mut conn, &result).await.unwrap();
    for port in [443, 80] {
        audit::insert_port(
            &mut conn,
            new,
            &OpenPort {
                local_port: port,
                state: "LISTEN".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }
    // A later pass without ports leaves the previous set visible.
    audit::insert_result(&mut conn, &result).await.unwrap();

    let ports = audit::latest_open_ports(&mut conn, server.id).await.unwrap();
    let numbers: Vec<i64> = ports.iter().map(|p| p.local_port).collect();
    assert_eq!(numbers, vec![80, 443]);
}

#[tokio::test]
async fn prune_removes_rows_past_retention() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let now = now_ms();
    let mut conn = store.pool().acquire().await.unwrap();

    metrics::insert_metrics(&mut conn, &sample(server.id, 10.0, 0)).await.unwrap();
    metrics::insert_metrics(&mut conn, &sample(server.id, 20.0, now)).await.unwrap();
    services::insert_service(
        &mut conn,
        &ServiceRecord {
            server_id: server.id,
            service_name: "old".into(),
            service_status: "stopped".into(),
            last_checked: 0,
        },
    )
    .await
    .unwrap();
    let stale = audit::insert_result(
        &mut conn,
        &DiscoveryResult {
            server_id: server.id,
            success: true,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    audit::insert_port(
        &mut conn,
        stale,
        &OpenPort {
            local_port: 22,
            ..Default::default()
        },
    )
    .await
    .unwrap();
    drop(conn);

    let removed = store.prune_old_data().await.unwrap();
    assert_eq!(removed, 3);
    assert_eq!(count(&store, "server_metrics", server.id).await, 1);
    assert_eq!(count(&store, "server_services", server.id).await, 0);
    assert_eq!(count(&store, "discovery_results", server.id).await, 0);

    let mut conn = store.pool().acquire().await.unwrap();
    assert!(audit::latest_open_ports(&mut conn, server.id).await.unwrap().is_empty());
    let ports: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM open_ports")
        .fetch_one(&mut *conn)
        .await
        .unwrap();
    assert_eq!(ports, 0);
    drop(conn);

    store.vacuum().await.unwrap();
}

#[tokio::test]
async fn fleet_stats_average_latest_samples_only() {
    let (_dir, store) = test_store().await;
    let a = add_server(&store, "a", "linux").await;
    let b = add_server(&store, "b", "linux").await;
    add_server(&store, "c", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();

    let empty = stats::fleet_stats(&mut conn).await.unwrap();
    assert_eq!(empty.total_servers, 3);
    assert_eq!(empty.offline, 3);
    assert!(empty.avg_cpu_usage.is_none());

    metrics::insert_metrics(&mut conn, &sample(a.id, 90.0, 1)).await.unwrap();
    metrics::insert_metrics(&mut conn, &sample(a.id, 40.0, 2)).await.unwrap();
    metrics::insert_metrics(&mut conn, &sample(b.id, 60.0, 2)).await.unwrap();
    servers::set_status(&mut conn, a.id, ServerStatus::Online, None, 2).await.unwrap();
    servers::set_status(&mut conn, b.id, ServerStatus::Error, Some("x"), 2).await.unwrap();

    let fleet = stats::fleet_stats(&mut conn).await.unwrap();
    assert_eq!(fleet.online, 1);
    assert_eq!(fleet.error, 1);
    assert_eq!(fleet.offline, 1);
    assert_eq!(fleet.avg_cpu_usage, Some(50.0));

    let latest = stats::latest_metrics_by_server(&mut conn).await.unwrap();
    assert_eq!(latest.len(), 2);
    assert_eq!(latest[&a.id].cpu_usage, 40.0);
}

#[tokio::test]
async fn deleting_a_server_cascades_to_its_rows() {
    let (_dir, store) = test_store().await;
    let server = add_server(&store, "web-1", "linux").await;
    let mut conn = store.pool().acquire().await.unwrap();
    metrics::insert_metrics(&mut conn, &sample(server.id, 10.0, now_ms())).await.unwrap();
    audit::insert_result(
        &mut conn,
        &DiscoveryResult {
            server_id: server.id,
            ..Default::default()
        },
    )
    .await
    .unwrap();

    sqlx::query("DELETE FROM servers WHERE id = $1")
        .bind(server.id)
        .execute(&mut *conn)
        .await
        .unwrap();
    drop(conn);

    assert_eq!(count(&store, "server_metrics", server.id).await, 0);
    assert_eq!(count(&store, "discovery_results", server.id).await, 0);
}
