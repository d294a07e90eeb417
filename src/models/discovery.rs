// Discovery audit: one row per pass, plus the ports seen during it

use serde::{Deserialize, Serialize};

/// Append-only record of a discovery pass (simulated or ingested).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub id: i64,
    pub server_id: i64,
    pub success: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub started_at: i64,
    pub finished_at: i64,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_cores: Option<i64>,
    pub memory_total: Option<i64>,
    pub disk_total: Option<i64>,
    pub boot_time: Option<i64>,
}

/// A listening or connected socket observed during a pass. Belongs to one discovery result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenPort {
    pub local_port: i64,
    #[serde(default)]
    pub local_ip: String,
    #[serde(default)]
    pub remote_port: Option<i64>,
    #[serde(default)]
    pub remote_ip: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub process_id: Option<i64>,
    #[serde(default)]
    pub process_name: Option<String>,
}

/// Outcome counts of one batch invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}
