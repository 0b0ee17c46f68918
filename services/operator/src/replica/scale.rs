//! Scale-up pass shared by the replica managers.
//!
//! A pass creates the task and then the service for each planned index, in
//! order, and stops at the first persist failure. Objects that already exist
//! under the derived name are adopted, so a pass that is retried after a
//! partial failure picks up where the previous one stopped. A name held by
//! a task that is no longer alive is skipped; the next pass, working from a
//! refreshed status, allocates past it.

use std::collections::HashSet;

use elasticjob_events::{EventReason, JobEvent};
use elasticjob_id::TaskIndex;
use elasticjob_reconcile::{Roster, RosterMode, ScaleUpPlan, TfConfig};
use tracing::{debug, info, warn};

use super::task::{TaskGroup, TaskSet};
use super::{ReconcileContext, ReconcileError, ReconcileResult};
use crate::job::{ElasticJob, ReplicaResourceSpec};
use crate::objects::{Pod, Service};

/// Inputs of one scale-up pass.
pub(super) struct ScaleUp<'a> {
    pub plan: ScaleUpPlan,
    pub roster_mode: RosterMode,

    /// The group's live roster before the pass.
    pub roster: Roster,

    /// The group's tasks as listed before the pass.
    pub existing: &'a [Pod],
}

/// What a scale-up pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct ScaleOutcome {
    /// Tasks newly created.
    pub created: u32,

    /// Live tasks that already existed under a planned name.
    pub adopted: u32,

    /// Planned names held by a task that is not alive.
    pub skipped: u32,
}

/// How a create call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Persisted {
    Created,
    Adopted,
}

/// Create the tasks in `pass.plan`.
///
/// `payload` builds a task's runtime configuration from the roster and its
/// index. Only newly created tasks are announced with a `Created` event.
pub(super) async fn scale_up<F>(
    ctx: &ReconcileContext,
    group: &TaskSet,
    job: &ElasticJob,
    spec: &ReplicaResourceSpec,
    pass: ScaleUp<'_>,
    payload: F,
) -> ReconcileResult<ScaleOutcome>
where
    F: Fn(&Roster, TaskIndex) -> TfConfig,
{
    let ScaleUp {
        plan,
        roster_mode,
        mut roster,
        existing,
    } = pass;

    info!(
        job = %job.name,
        replica_type = %group.replica_type(),
        start = %plan.start,
        count = plan.count,
        peers = roster.len(),
        %roster_mode,
        "Scaling up task group"
    );

    let mut outcome = ScaleOutcome::default();
    for index in plan.indices() {
        let mut pod = group.new_task(job, spec, index);
        group.insert_tf_config(&mut pod, &payload(&roster, index))?;
        let service = group.new_task_service(job, index);

        if create_pod(ctx, group, job, pod).await? == Persisted::Adopted {
            let listed = existing.iter().find(|p| p.name == service.name);
            if let Some(pod) = listed.filter(|p| !p.phase.is_alive()) {
                warn!(
                    job = %job.name,
                    pod = %pod.name,
                    phase = %pod.phase,
                    "Planned task name is held by a task that is not alive"
                );
                outcome.skipped += 1;
                continue;
            }
            create_service(ctx, group, job, service).await?;
            outcome.adopted += 1;
        } else {
            create_service(ctx, group, job, service).await?;
            outcome.created += 1;
            ctx.recorder.record(JobEvent::normal(
                job.name.clone(),
                EventReason::Created,
                format!(
                    "{} task {} created",
                    group.display_name(),
                    group.task_service_addr(&job.name, index)
                ),
            ));
        }

        if roster_mode == RosterMode::Incremental {
            roster.push(group.task_service_addr(&job.name, index));
        }
    }

    Ok(outcome)
}

/// Create services for live tasks that lack one.
///
/// A task whose service create failed in an earlier pass is still counted
/// as alive, so no later scale-up would revisit its index.
pub(super) async fn repair_services(
    ctx: &ReconcileContext,
    group: &TaskSet,
    job: &ElasticJob,
    pods: &[Pod],
) -> ReconcileResult<u32> {
    let existing: HashSet<String> = ctx
        .store
        .list_services(&group.selector(&job.name))
        .await
        .map_err(|source| ReconcileError::List { source })?
        .into_iter()
        .map(|s| s.name)
        .collect();

    let mut repaired = 0;
    for pod in pods.iter().filter(|p| p.phase.is_alive()) {
        let Some(index) = pod.index() else {
            continue;
        };
        let service = group.new_task_service(job, index);
        if existing.contains(&service.name) {
            continue;
        }

        warn!(
            job = %job.name,
            pod = %pod.name,
            "Task has no service, recreating it"
        );
        create_service(ctx, group, job, service).await?;
        repaired += 1;
    }

    Ok(repaired)
}

async fn create_pod(
    ctx: &ReconcileContext,
    group: &TaskSet,
    job: &ElasticJob,
    pod: Pod,
) -> ReconcileResult<Persisted> {
    let name = pod.name.clone();
    match ctx.store.create_pod(pod).await {
        Ok(()) => {
            debug!(job = %job.name, pod = %name, "Created pod");
            Ok(Persisted::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(job = %job.name, pod = %name, "Pod already exists, adopting it");
            Ok(Persisted::Adopted)
        }
        Err(e) => {
            ctx.recorder.record(JobEvent::warning(
                job.name.clone(),
                EventReason::PodFailed,
                format!("{} pod {} created failed: {}", group.display_name(), name, e),
            ));
            Err(ReconcileError::CreatePod { name, source: e })
        }
    }
}

async fn create_service(
    ctx: &ReconcileContext,
    group: &TaskSet,
    job: &ElasticJob,
    service: Service,
) -> ReconcileResult<()> {
    let name = service.name.clone();
    match ctx.store.create_service(service).await {
        Ok(()) => {
            debug!(job = %job.name, service = %name, "Created service");
            Ok(())
        }
        Err(e) if e.is_already_exists() => {
            debug!(job = %job.name, service = %name, "Service already exists, adopting it");
            Ok(())
        }
        Err(e) => {
            ctx.recorder.record(JobEvent::warning(
                job.name.clone(),
                EventReason::ServiceFailed,
                format!(
                    "{} service {} created failed: {}",
                    group.display_name(),
                    name,
                    e
                ),
            ));
            Err(ReconcileError::CreateService { name, source: e })
        }
    }
}
