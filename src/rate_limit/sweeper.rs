//! Background Sweep
//!
//! Periodically evicts idle clients from an [`AdmissionController`]. The task
//! stops cooperatively when its [`SweeperHandle`] is shut down or dropped;
//! in-flight `allow` calls are unaffected and the registry is not drained.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::manager::AdmissionController;
use crate::metrics;

/// Handle to a running sweep task
#[derive(Debug)]
pub struct SweeperHandle {
    /// Shutdown signal
    shutdown_tx: watch::Sender<bool>,

    /// Sweep task
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop scheduling sweeps and wait for the task to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!("Rate limit sweeper ended abnormally: {}", e);
        }
    }
}

/// Spawn the sweep loop on the current runtime
pub(crate) fn spawn(controller: Arc<AdmissionController>, every: Duration) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let every = every.max(Duration::from_millis(1));

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing is idle yet
        interval.tick().await;

        info!(interval_secs = every.as_secs_f64(), "Rate limit sweeper started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let evicted = controller.evict_idle();
                    let tracked = controller.tracked_clients();

                    metrics::EVICTED_CLIENTS_TOTAL.inc_by(evicted as u64);
                    metrics::TRACKED_CLIENTS.set(tracked as i64);

                    debug!(evicted, tracked, "Rate limit sweep completed");
                }
                changed = shutdown_rx.changed() => {
                    // Err means the handle was dropped
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Rate limit sweeper stopped");
    });

    SweeperHandle { shutdown_tx, task }
}
