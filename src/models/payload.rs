// Inbound discovery payload from an external collector.
// Validated section by section: a missing or mistyped section is dropped and noted in
// `issues`, so the metric derived from it falls back to 0. Only a non-object document is
// rejected outright.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{ObservedService, OpenPort};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed discovery payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CpuSection {
    #[serde(default)]
    pub usage: Option<f64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub cores: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CapacitySection {
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub used: Option<f64>,
}

impl CapacitySection {
    fn usage_percent(&self) -> f64 {
        usage_percent(self.used.unwrap_or(0.0), self.total.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DiskSection {
    #[serde(default)]
    pub drives: Vec<CapacitySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OsSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryPayload {
    pub cpu: Option<CpuSection>,
    pub memory: Option<CapacitySection>,
    pub disk: Option<DiskSection>,
    pub os: Option<OsSection>,
    /// Unix milliseconds.
    pub boot_time: Option<i64>,
    pub services: Vec<ObservedService>,
    pub ports: Vec<OpenPort>,
    /// Sections that were present but could not be read.
    pub issues: Vec<String>,
}

impl DiscoveryPayload {
    pub fn from_json(value: Value) -> Result<Self, PayloadError> {
        let Value::Object(obj) = value else {
            return Err(PayloadError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };
        let mut issues = Vec::new();
        let cpu = section(&obj, "cpu", &mut issues);
        let memory = section(&obj, "memory", &mut issues);
        let disk = section(&obj, "disk", &mut issues);
        let os = section(&obj, "os", &mut issues);
        let boot_time = section(&obj, "boot_time", &mut issues);
        let services = list(&obj, "services", &mut issues);
        let ports = list(&obj, "ports", &mut issues);
        Ok(Self {
            cpu,
            memory,
            disk,
            os,
            boot_time,
            services,
            ports,
            issues,
        })
    }

    pub fn cpu_usage(&self) -> f64 {
        let usage = self.cpu.as_ref().and_then(|c| c.usage).unwrap_or(0.0);
        clamp_percent(usage)
    }

    pub fn memory_usage(&self) -> f64 {
        self.memory
            .as_ref()
            .map(CapacitySection::usage_percent)
            .unwrap_or(0.0)
    }

    /// Usage of the first drive only.
    pub fn disk_usage(&self) -> f64 {
        self.disk
            .as_ref()
            .and_then(|d| d.drives.first())
            .map(CapacitySection::usage_percent)
            .unwrap_or(0.0)
    }

    pub fn memory_total(&self) -> Option<i64> {
        self.memory.as_ref().and_then(|m| m.total).map(|t| t as i64)
    }

    pub fn disk_total(&self) -> Option<i64> {
        self.disk
            .as_ref()
            .and_then(|d| d.drives.first())
            .and_then(|d| d.total)
            .map(|t| t as i64)
    }
}

/// `used / total * 100`, clamped to 0..=100. A zero or invalid total yields 0.
pub fn usage_percent(used: f64, total: f64) -> f64 {
    if total <= 0.0 || !total.is_finite() {
        return 0.0;
    }
    clamp_percent(used / total * 100.0)
}

fn clamp_percent(v: f64) -> f64 {
    if v.is_finite() { v.clamp(0.0, 100.0) } else { 0.0 }
}

fn section<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
    issues: &mut Vec<String>,
) -> Option<T> {
    let v = obj.get(key)?;
    if v.is_null() {
        return None;
    }
    match serde_json::from_value(v.clone()) {
        Ok(t) => Some(t),
        Err(e) => {
            issues.push(format!("{key}: {e}"));
            None
        }
    }
}

/// Reads an array element by element; unreadable elements are skipped and noted.
fn list<T: DeserializeOwned>(
    obj: &Map<String, Value>,
    key: &str,
    issues: &mut Vec<String>,
) -> Vec<T> {
    let Some(v) = obj.get(key) else {
        return vec![];
    };
    let Value::Array(items) = v else {
        if !v.is_null() {
            issues.push(format!("{key}: expected an array, got {}", json_kind(v)));
        }
        return vec![];
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match serde_json::from_value(item.clone()) {
            Ok(t) => out.push(t),
            Err(e) => issues.push(format!("{key}[{i}]: {e}")),
        }
    }
    out
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
