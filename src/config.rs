use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

use crate::discovery::DiscoveryConfig;
use crate::models::{Band, MetricBands};
use crate::reconcile::HardwareCatalog;
use crate::worker::WorkerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discovery: DiscoverySettings,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
    #[serde(default)]
    pub catalog: HardwareCatalog,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_retention_days() -> u32 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscoverySettings {
    pub interval_secs: u64,
    /// Only servers whose os_type starts with this are discovered on schedule. Empty = all.
    #[serde(default)]
    pub target_os_prefix: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_pass_timeout_secs")]
    pub pass_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub run_on_start: bool,
    /// How often to log discovery totals at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
    #[serde(default)]
    pub bands: MetricBands,
}

fn default_concurrency() -> usize {
    1
}

fn default_pass_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

fn default_stats_log_interval_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    #[serde(default = "default_prune_interval_secs")]
    pub prune_interval_secs: u64,
    /// Cron expression (with seconds field), local time. Overrides vacuum_interval_secs.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

fn default_prune_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: default_prune_interval_secs(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("reading config {}: {}", path, e))?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            target_os_prefix: self.discovery.target_os_prefix.clone(),
            bands: self.discovery.bands,
            concurrency: self.discovery.concurrency,
            pass_timeout: Duration::from_secs(self.discovery.pass_timeout_secs),
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            discovery_interval_secs: self.discovery.interval_secs,
            run_on_start: self.discovery.run_on_start,
            stats_log_interval_secs: self.discovery.stats_log_interval_secs,
            prune_interval_secs: self.maintenance.prune_interval_secs,
            vacuum_schedule: self.maintenance.vacuum_schedule.clone(),
            vacuum_interval_secs: self.maintenance.vacuum_interval_secs,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.discovery.interval_secs > 0,
            "discovery.interval_secs must be > 0, got {}",
            self.discovery.interval_secs
        );
        anyhow::ensure!(
            self.discovery.concurrency > 0,
            "discovery.concurrency must be > 0, got {}",
            self.discovery.concurrency
        );
        anyhow::ensure!(
            self.discovery.pass_timeout_secs > 0,
            "discovery.pass_timeout_secs must be > 0, got {}",
            self.discovery.pass_timeout_secs
        );
        anyhow::ensure!(
            self.discovery.stats_log_interval_secs > 0,
            "discovery.stats_log_interval_secs must be > 0, got {}",
            self.discovery.stats_log_interval_secs
        );
        validate_band("discovery.bands.cpu", self.discovery.bands.cpu)?;
        validate_band("discovery.bands.memory", self.discovery.bands.memory)?;
        validate_band("discovery.bands.disk", self.discovery.bands.disk)?;
        anyhow::ensure!(
            self.maintenance.prune_interval_secs > 0,
            "maintenance.prune_interval_secs must be > 0, got {}",
            self.maintenance.prune_interval_secs
        );
        anyhow::ensure!(
            self.maintenance.vacuum_interval_secs > 0,
            "maintenance.vacuum_interval_secs must be > 0, got {}",
            self.maintenance.vacuum_interval_secs
        );
        if let Some(ref expr) = self.maintenance.vacuum_schedule {
            cron::Schedule::from_str(expr).map_err(|e| {
                anyhow::anyhow!("maintenance.vacuum_schedule is not a valid cron expression: {}", e)
            })?;
        }
        self.catalog.validate()?;
        Ok(())
    }
}

fn validate_band(name: &str, band: Band) -> anyhow::Result<()> {
    anyhow::ensure!(
        band.min.is_finite() && band.max.is_finite(),
        "{} must be finite, got [{}, {}]",
        name,
        band.min,
        band.max
    );
    anyhow::ensure!(
        band.min <= band.max,
        "{} min must be <= max, got [{}, {}]",
        name,
        band.min,
        band.max
    );
    anyhow::ensure!(
        band.min >= 0.0 && band.max <= 100.0,
        "{} must lie within [0, 100], got [{}, {}]",
        name,
        band.min,
        band.max
    );
    Ok(())
}
