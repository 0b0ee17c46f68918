//! Dispatch of jobs to replica managers.

use elasticjob_reconcile::ReplicaStatus;
use tracing::{debug, info, instrument, warn};

use crate::job::{ElasticJob, JobStatus};
use crate::objects::LabelSelector;
use crate::replica::{ReconcileContext, ReconcileError, ReconcileResult, ReplicaManagers};

/// Statistics from a reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub jobs_processed: u32,
    pub groups_reconciled: u32,
    pub groups_failed: u32,
    pub groups_skipped: u32,
}

/// Drives replica managers for every job in the store.
#[derive(Clone)]
pub struct JobController {
    ctx: ReconcileContext,
    managers: ReplicaManagers,
}

impl JobController {
    /// Create a controller over an explicit manager registry.
    pub fn new(ctx: ReconcileContext, managers: ReplicaManagers) -> Self {
        Self { ctx, managers }
    }

    /// Reconcile every job once.
    #[instrument(skip(self))]
    pub async fn reconcile_all(&self) -> ReconcileResult<ReconcileStats> {
        let jobs = self
            .ctx
            .store
            .list_jobs()
            .await
            .map_err(|source| ReconcileError::List { source })?;
        debug!(job_count = jobs.len(), "Found jobs to reconcile");

        let mut stats = ReconcileStats::default();
        for job in jobs {
            match self.reconcile_job(&job).await {
                Ok(job_stats) => {
                    stats.jobs_processed += 1;
                    stats.groups_reconciled += job_stats.groups_reconciled;
                    stats.groups_failed += job_stats.groups_failed;
                    stats.groups_skipped += job_stats.groups_skipped;
                }
                Err(e) => {
                    warn!(job = %job.name, error = %e, "Failed to reconcile job");
                }
            }
        }

        info!(
            jobs_processed = stats.jobs_processed,
            groups_reconciled = stats.groups_reconciled,
            groups_failed = stats.groups_failed,
            "Reconciliation pass complete"
        );

        Ok(stats)
    }

    /// Reconcile one job.
    ///
    /// A failing task group is logged and counted; the remaining groups of
    /// the job are still reconciled.
    #[instrument(skip(self, job), fields(job = %job.name))]
    pub async fn reconcile_job(&self, job: &ElasticJob) -> ReconcileResult<ReconcileStats> {
        let job = self.refresh_status(job).await?;
        let mut stats = ReconcileStats::default();

        for (replica_type, spec) in &job.replica_specs {
            let Some(manager) = self.managers.get(*replica_type) else {
                let e = ReconcileError::UnknownReplicaType(*replica_type);
                warn!(error = %e, "Skipping task group");
                stats.groups_skipped += 1;
                continue;
            };

            match manager.reconcile_pods(&self.ctx, &job, spec).await {
                Ok(()) => stats.groups_reconciled += 1,
                Err(e) => {
                    warn!(
                        replica_type = %replica_type,
                        error = %e,
                        "Failed to reconcile task group"
                    );
                    stats.groups_failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Recount each task group's phases from the store and write the result
    /// back as the job's status.
    async fn refresh_status(&self, job: &ElasticJob) -> ReconcileResult<ElasticJob> {
        let mut status = JobStatus::default();
        for replica_type in job.replica_specs.keys() {
            let pods = self
                .ctx
                .store
                .list_pods(&LabelSelector::for_group(&job.name, *replica_type))
                .await
                .map_err(|source| ReconcileError::List { source })?;
            let replica_status = ReplicaStatus::from_phases(pods.iter().map(|p| p.phase));
            status.replica_statuses.insert(*replica_type, replica_status);
        }

        if status != job.status {
            self.ctx
                .store
                .update_job_status(&job.name, status.clone())
                .await
                .map_err(|source| ReconcileError::UpdateStatus {
                    job: job.name.to_string(),
                    source,
                })?;
        }

        let mut refreshed = job.clone();
        refreshed.status = status;
        Ok(refreshed)
    }
}
