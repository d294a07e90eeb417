// Table definitions. Every statement is idempotent; init runs at each startup.

use sqlx::SqlitePool;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS servers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        hostname TEXT NOT NULL,
        ip TEXT NOT NULL,
        os_type TEXT NOT NULL DEFAULT '',
        region TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'offline',
        last_checked INTEGER,
        last_error TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS server_details (
        server_id INTEGER PRIMARY KEY REFERENCES servers(id) ON DELETE CASCADE,
        cpu_model TEXT NOT NULL,
        cpu_cores INTEGER NOT NULL,
        memory_total INTEGER NOT NULL,
        disk_total INTEGER NOT NULL,
        os_version TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS server_metrics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
        cpu_usage REAL NOT NULL,
        memory_usage REAL NOT NULL,
        disk_usage REAL NOT NULL,
        recorded_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_metrics_server_recorded ON server_metrics(server_id, recorded_at)",
    r#"
    CREATE TABLE IF NOT EXISTS server_services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
        service_name TEXT NOT NULL,
        service_status TEXT NOT NULL,
        last_checked INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_services_server_checked ON server_services(server_id, last_checked)",
    r#"
    CREATE TABLE IF NOT EXISTS discovery_results (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
        success INTEGER NOT NULL,
        message TEXT,
        error TEXT,
        started_at INTEGER NOT NULL,
        finished_at INTEGER NOT NULL,
        os_name TEXT,
        os_version TEXT,
        cpu_model TEXT,
        cpu_cores INTEGER,
        memory_total INTEGER,
        disk_total INTEGER,
        boot_time INTEGER
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_discovery_server ON discovery_results(server_id, id)",
    r#"
    CREATE TABLE IF NOT EXISTS open_ports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        discovery_id INTEGER NOT NULL REFERENCES discovery_results(id) ON DELETE CASCADE,
        local_port INTEGER NOT NULL,
        local_ip TEXT NOT NULL,
        remote_port INTEGER,
        remote_ip TEXT,
        state TEXT NOT NULL,
        description TEXT,
        process_id INTEGER,
        process_name TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_open_ports_discovery ON open_ports(discovery_id)",
    r#"
    CREATE TABLE IF NOT EXISTS server_tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        server_id INTEGER NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
        tag_name TEXT NOT NULL,
        tag_value TEXT NOT NULL
    )
    "#,
];

pub async fn init_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    for stmt in STATEMENTS {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
