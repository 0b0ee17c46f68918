//! Controller background worker.
//!
//! Runs the job controller on a periodic interval.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, instrument};

use super::dispatcher::JobController;

/// Worker that re-triggers reconciliation of every job.
pub struct ControllerWorker {
    controller: JobController,
    interval: Duration,
}

impl ControllerWorker {
    /// Create a new controller worker.
    pub fn new(controller: JobController, interval: Duration) -> Self {
        Self {
            controller,
            interval,
        }
    }

    /// Run the controller until shutdown is signaled.
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting controller worker"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.controller.reconcile_all().await {
                        error!(error = %e, "Controller reconciliation failed");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("Controller worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}
