// Server inventory: identity, lifecycle status, hardware details, tags

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status; serializes to lowercase JSON and is stored as lowercase TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    Offline,
    Error,
}

impl ServerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerStatus::Online => "online",
            ServerStatus::Offline => "offline",
            ServerStatus::Error => "error",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "online" => Ok(ServerStatus::Online),
            "offline" => Ok(ServerStatus::Offline),
            "error" => Ok(ServerStatus::Error),
            other => Err(format!("unknown server status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: i64,
    pub hostname: String,
    pub ip: String,
    pub os_type: String,
    pub region: String,
    pub status: ServerStatus,
    /// Unix milliseconds of the last recorded pass; `None` until first discovered.
    pub last_checked: Option<i64>,
    pub last_error: Option<String>,
}

/// Administrative input for registering a server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewServer {
    pub hostname: String,
    pub ip: String,
    pub os_type: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Hardware attributes, 1:1 with a server. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerDetail {
    pub server_id: i64,
    pub cpu_model: String,
    pub cpu_cores: i64,
    /// Bytes.
    pub memory_total: i64,
    /// Bytes.
    pub disk_total: i64,
    pub os_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}
