// Running-service snapshots

use serde::{Deserialize, Serialize};

/// One observed service state. Several rows per name may exist; readers take the newest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub server_id: i64,
    pub service_name: String,
    pub service_status: String,
    pub last_checked: i64,
}

/// A service as reported by a collector, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedService {
    pub name: String,
    #[serde(default)]
    pub status: String,
}
