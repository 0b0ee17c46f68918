//! Parameter server replica manager.

use async_trait::async_trait;
use elasticjob_id::ReplicaType;
use elasticjob_networking::PS_SERVICE_PORT;
use elasticjob_reconcile::{RosterMode, ScaleUpPlan, TfConfig};
use tracing::{debug, info, instrument};

use super::scale::{repair_services, scale_up, ScaleUp};
use super::task::{TaskGroup, TaskSet};
use super::{ReconcileContext, ReconcileResult, ReplicaManager};
use crate::job::{ElasticJob, ReplicaResourceSpec};

/// Scales up the parameter servers of a job.
///
/// Every new parameter server gets a `TF_CONFIG` listing the live parameter
/// servers of the job and its own index.
#[derive(Debug, Clone)]
pub struct PsManager {
    tasks: TaskSet,
    roster_mode: RosterMode,
}

impl PsManager {
    pub fn new(roster_mode: RosterMode) -> Self {
        Self {
            tasks: TaskSet::new(ReplicaType::Ps, PS_SERVICE_PORT),
            roster_mode,
        }
    }

    /// The task factory backing this manager.
    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }
}

#[async_trait]
impl ReplicaManager for PsManager {
    fn replica_type(&self) -> ReplicaType {
        ReplicaType::Ps
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
            info!(repaired, "Recreated missing PS services");
        }

        let status = self.tasks.task_status(job);
        let Some(plan) = ScaleUpPlan::compute(&status, spec.replicas) else {
            debug!(
                alive = status.alive(),
                total = self.tasks.total_task_count(&status),
                desired = spec.replicas,
                "PS group converged"
            );
            return Ok(());
        };

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
            |roster, index| TfConfig::new(ReplicaType::Ps, roster.clone(), index),
        )
        .await?;

        info!(
            created = outcome.created,
            adopted = outcome.adopted,
            skipped = outcome.skipped,
            "PS scale-up complete"
        );
        Ok(())
    }
}
