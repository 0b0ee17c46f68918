//! Worker replica manager.

use async_trait::async_trait;
use elasticjob_id::ReplicaType;
use elasticjob_networking::{PS_SERVICE_PORT, WORKER_SERVICE_PORT};
use elasticjob_reconcile::{RosterMode, ScaleUpPlan, TfConfig};
use tracing::{debug, info, instrument};

use super::scale::{repair_services, scale_up, ScaleUp};
use super::task::{TaskGroup, TaskSet};
use super::{ReconcileContext, ReconcileResult, ReplicaManager};
use crate::job::{ElasticJob, ReplicaResourceSpec};

/// Scales up the workers of a job.
///
/// A worker's `TF_CONFIG` lists both the live workers and the live
/// parameter servers, since workers push gradients to the latter.
#[derive(Debug, Clone)]
pub struct WorkerManager {
    tasks: TaskSet,
    ps: TaskSet,
    roster_mode: RosterMode,
}

impl WorkerManager {
    pub fn new(roster_mode: RosterMode) -> Self {
        Self {
            tasks: TaskSet::new(ReplicaType::Worker, WORKER_SERVICE_PORT),
            ps: TaskSet::new(ReplicaType::Ps, PS_SERVICE_PORT),
            roster_mode,
        }
    }
}

#[async_trait]
impl ReplicaManager for WorkerManager {
    fn replica_type(&self) -> ReplicaType {
        ReplicaType::Worker
    }

    #[instrument(skip(self, ctx, job, spec), fields(job = %job.name, replicas = spec.replicas))]
    async fn reconcile_pods(
        &self,
        ctx: &ReconcileContext,
        job: &ElasticJob,
        spec: &ReplicaResourceSpec,
    ) -> ReconcileResult<()> {
        let pods = self.tasks.list_tasks(ctx, &job.name).await?;
        let repaired = repair_services(ctx, &self.tasks, job, &pods).await?;
        if repaired > 0 {
            info!(repaired, "Recreated missing worker services");
        }

        let status = self.tasks.task_status(job);
        let Some(plan) = ScaleUpPlan::compute(&status, spec.replicas) else {
            debug!(alive = status.alive(), desired = spec.replicas, "Worker group converged");
            return Ok(());
        };

        let ps_pods = self.ps.list_tasks(ctx, &job.name).await?;
        let mut ps_roster = self.ps.roster(&ps_pods, &job.name);
        ps_roster.sort_by_index(&job.name, ReplicaType::Ps);

        let roster = self.tasks.roster(&pods, &job.name);
        let pass = ScaleUp {
            plan,
            roster_mode: self.roster_mode,
            roster,
            existing: &pods,
        };
        let outcome = scale_up(
            ctx,
            &self.tasks,
            job,
            spec,
            pass,
            |roster, index| {
                TfConfig::new(ReplicaType::Worker, roster.clone(), index)
                    .with_group(ReplicaType::Ps, ps_roster.clone())
            },
        )
        .await?;

        info!(
            created = outcome.created,
            adopted = outcome.adopted,
            skipped = outcome.skipped,
            "Worker scale-up complete"
        );
        Ok(())
    }
}
