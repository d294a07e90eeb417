// Bounded random walk for simulated usage metrics.
// The generator is injected so tests can seed it; main builds one from OS entropy.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::{Band, MetricBands, MetricSample};

/// Largest step, in percentage points, between two consecutive samples.
pub const MAX_STEP: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedSample {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
}

pub struct MetricSimulator {
    rng: StdRng,
}

impl MetricSimulator {
    pub fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_os_rng())
    }

    /// Next value of a walk in `[min, max]`. `last == 0` means no history: returns the midpoint.
    pub fn next_value(&mut self, last: f64, min: f64, max: f64) -> f64 {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        if last == 0.0 {
            return min + (max - min) * 0.5;
        }
        let delta = self.rng.random_range(-MAX_STEP..=MAX_STEP);
        (last + delta).clamp(min, max)
    }

    pub fn next_in(&mut self, last: f64, band: Band) -> f64 {
        self.next_value(last, band.min, band.max)
    }

    /// Next sample for every component, walking from `previous` (or the midpoints if `None`).
    pub fn next_sample(
        &mut self,
        previous: Option<&MetricSample>,
        bands: &MetricBands,
    ) -> SimulatedSample {
        let (cpu, memory, disk) = previous
            .map(|p| (p.cpu_usage, p.memory_usage, p.disk_usage))
            .unwrap_or((0.0, 0.0, 0.0));
        SimulatedSample {
            cpu_usage: self.next_in(cpu, bands.cpu),
            memory_usage: self.next_in(memory, bands.memory),
            disk_usage: self.next_in(disk, bands.disk),
        }
    }
}
