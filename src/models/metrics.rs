// Metric samples and the usage bands the simulator walks within

use serde::{Deserialize, Serialize};

/// One append-only usage sample. Percentages; `recorded_at` is unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub server_id: i64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub recorded_at: i64,
}

/// Inclusive `[min, max]` range. Deserializes from a two-element array, e.g. `[40.0, 80.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

impl From<(f64, f64)> for Band {
    fn from((min, max): (f64, f64)) -> Self {
        Self { min, max }
    }
}

impl From<Band> for (f64, f64) {
    fn from(b: Band) -> Self {
        (b.min, b.max)
    }
}

/// Per-component bands of a simulation profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricBands {
    #[serde(default = "default_cpu_band")]
    pub cpu: Band,
    #[serde(default = "default_memory_band")]
    pub memory: Band,
    #[serde(default = "default_disk_band")]
    pub disk: Band,
}

fn default_cpu_band() -> Band {
    Band::new(40.0, 80.0)
}

fn default_memory_band() -> Band {
    Band::new(50.0, 85.0)
}

fn default_disk_band() -> Band {
    Band::new(40.0, 90.0)
}

impl Default for MetricBands {
    fn default() -> Self {
        Self {
            cpu: default_cpu_band(),
            memory: default_memory_band(),
            disk: default_disk_band(),
        }
    }
}
