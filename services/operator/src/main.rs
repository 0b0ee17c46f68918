//! elasticjob operator
//!
//! Periodically reconciles every elastic training job it knows about,
//! creating the parameter server and worker tasks each job is missing.
//!
//! ## Architecture
//!
//! - **Store**: in-memory object store, optionally seeded from a jobs file
//! - **Managers**: one replica manager per task group type, in an explicit registry
//! - **Controller worker**: re-triggers reconciliation on a fixed interval

use std::sync::Arc;

use anyhow::{Context, Result};
use elasticjob_operator::{
    config::Config, ControllerWorker, ElasticJob, JobController, MemoryRecorder, MemoryStore,
    ReconcileContext, ReplicaManagers,
};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to ELASTICJOB_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting elasticjob operator");
    info!(
        reconcile_interval_secs = config.reconcile_interval.as_secs(),
        roster_mode = %config.roster_mode,
        "Configuration loaded"
    );

    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &config.jobs_file {
        let jobs = load_jobs(path).await?;
        info!(path = %path.display(), job_count = jobs.len(), "Loaded jobs");
        for job in jobs {
            store.put_job(job).await;
        }
    }

    let ctx = ReconcileContext::new(store, Arc::new(MemoryRecorder::new()));
    let managers = ReplicaManagers::with_defaults(config.roster_mode);
    let controller = JobController::new(ctx, managers);
    let worker = ControllerWorker::new(controller, config.reconcile_interval);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_handle = tokio::spawn(async move {
        worker.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("Received shutdown signal");

    if shutdown_tx.send(true).is_err() {
        warn!("Controller worker already stopped");
    }

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, worker_handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "Controller worker panicked"),
        Err(e) => warn!(error = %e, "Controller worker did not shut down in time"),
    }

    info!("Operator shutdown complete");
    Ok(())
}

async fn load_jobs(path: &std::path::Path) -> Result<Vec<ElasticJob>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read jobs file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid jobs file {}", path.display()))
}
