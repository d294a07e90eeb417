// Background discovery worker: runs a batch every interval, prunes old rows, and VACUUMs on
// a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;

use tokio::time::{Duration, Instant, interval, interval_at};
use tracing::{Instrument, info, warn};

use crate::discovery::Discovery;
use crate::store::Store;

pub struct WorkerDeps {
    pub discovery: Arc<Discovery>,
    pub store: Arc<Store>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing. All intervals are real seconds.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub discovery_interval_secs: u64,
    /// Run the first batch immediately instead of after one interval.
    pub run_on_start: bool,
    pub stats_log_interval_secs: u64,
    pub prune_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        discovery,
        store,
        mut shutdown_rx,
    } = deps;

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        discovery_interval_secs = config.discovery_interval_secs
    );

    let task = async move {
        let period = Duration::from_secs(config.discovery_interval_secs);
        let first = if config.run_on_start {
            Instant::now()
        } else {
            Instant::now() + period
        };
        let mut discovery_tick = interval_at(first, period);
        discovery_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut prune_tick = interval(Duration::from_secs(config.prune_interval_secs));
        prune_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
        let vacuum_handle = tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

        let mut batches_run: u64 = 0;
        let mut passes_succeeded: u64 = 0;
        let mut passes_failed: u64 = 0;
        let mut rows_pruned: u64 = 0;

        loop {
            tokio::select! {
                _ = discovery_tick.tick() => {
                    match discovery.run_batch().await {
                        Ok(report) => {
                            batches_run += 1;
                            passes_succeeded += report.succeeded as u64;
                            passes_failed += report.failed as u64;
                        }
                        Err(e) => {
                            warn!(error = %e, operation = "run_batch", "discovery batch failed");
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    info!(
                        batches_run,
                        passes_succeeded,
                        passes_failed,
                        rows_pruned,
                        "discovery stats"
                    );
                }
                _ = prune_tick.tick() => {
                    match store.prune_old_data().await {
                        Ok(n) => {
                            tracing::debug!(operation = "prune_old_data", rows = n, "Old data pruned");
                            rows_pruned += n;
                        }
                        Err(e) => {
                            warn!(error = %e, operation = "prune_old_data", "Failed to prune old data");
                        }
                    }
                }
                Some(()) = vacuum_rx.recv() => {
                    if let Err(e) = store.vacuum().await {
                        warn!(error = %e, "vacuum failed");
                    } else {
                        info!("vacuum complete");
                    }
                }
            }
        }
        vacuum_handle.abort();
    };
    tokio::spawn(task.instrument(worker_span))
}

/// Sends a message on `tx` at each VACUUM time (cron or fixed interval). Uses local time for cron.
async fn vacuum_scheduler(config: WorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.vacuum_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid vacuum_schedule; VACUUM will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let interval = Duration::from_secs(config.vacuum_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}
