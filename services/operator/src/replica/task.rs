//! Task factory shared by all replica managers.
//!
//! Every name, label, and address is derived from `(job name, replica type,
//! index)`, so building the objects for an index twice yields the same
//! names and the store can reject the duplicate.

use elasticjob_id::{JobName, ReplicaType, TaskIndex};
use elasticjob_networking::{service_addr, task_name};
use elasticjob_reconcile::{build_hosts, ReplicaStatus, Roster, TfConfig, TF_CONFIG_ENV};

use super::{ReconcileContext, ReconcileError, ReconcileResult};
use crate::job::{ElasticJob, ReplicaResourceSpec};
use crate::objects::{task_labels, Container, LabelSelector, Pod, Service, MAIN_CONTAINER};

/// Capabilities every task group provides to its manager.
pub trait TaskGroup {
    /// The group's replica type.
    fn replica_type(&self) -> ReplicaType;

    /// Status summary of the group from the job's status.
    fn task_status(&self, job: &ElasticJob) -> ReplicaStatus;

    /// Number of tasks ever created for the group.
    fn total_task_count(&self, status: &ReplicaStatus) -> u32;

    /// Build the (unscheduled) task at `index`.
    fn new_task(&self, job: &ElasticJob, spec: &ReplicaResourceSpec, index: TaskIndex) -> Pod;

    /// Build the service in front of the task at `index`.
    fn new_task_service(&self, job: &ElasticJob, index: TaskIndex) -> Service;

    /// Address peers use to reach the task at `index`.
    fn task_service_addr(&self, job: &JobName, index: TaskIndex) -> String;
}

/// The tasks of one replica type, served on a fixed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSet {
    replica_type: ReplicaType,
    port: u16,
}

impl TaskSet {
    pub const fn new(replica_type: ReplicaType, port: u16) -> Self {
        Self { replica_type, port }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Label selector matching this group's objects.
    pub fn selector(&self, job: &JobName) -> LabelSelector {
        LabelSelector::for_group(job, self.replica_type)
    }

    /// Prefix used in event messages, e.g. `PS`.
    pub fn display_name(&self) -> String {
        self.replica_type.as_str().to_uppercase()
    }

    /// List the group's tasks from the store.
    pub async fn list_tasks(&self, ctx: &ReconcileContext, job: &JobName) -> ReconcileResult<Vec<Pod>> {
        ctx.store
            .list_pods(&self.selector(job))
            .await
            .map_err(|source| ReconcileError::List { source })
    }

    /// Roster of the group's live tasks, in listing order.
    pub fn roster(&self, pods: &[Pod], job: &JobName) -> Roster {
        build_hosts(pods, job, self.replica_type, self.port)
    }

    /// Write the runtime payload into the task's main container.
    pub fn insert_tf_config(&self, pod: &mut Pod, payload: &TfConfig) -> ReconcileResult<()> {
        let value = payload.to_env_value()?;
        let Some(container) = pod.containers.first_mut() else {
            return Err(ReconcileError::NoContainer(pod.name.clone()));
        };
        container.set_env(TF_CONFIG_ENV, value);
        Ok(())
    }
}

impl TaskGroup for TaskSet {
    fn replica_type(&self) -> ReplicaType {
        self.replica_type
    }

    fn task_status(&self, job: &ElasticJob) -> ReplicaStatus {
        job.status.replica(self.replica_type)
    }

    fn total_task_count(&self, status: &ReplicaStatus) -> u32 {
        status.total()
    }

    fn new_task(&self, job: &ElasticJob, spec: &ReplicaResourceSpec, index: TaskIndex) -> Pod {
        Pod {
            name: task_name(&job.name, self.replica_type, index),
            labels: task_labels(&job.name, self.replica_type, index),
            phase: Default::default(),
            containers: vec![Container {
                name: MAIN_CONTAINER.to_string(),
                image: spec.image.clone(),
                command: spec.command.clone(),
                env: spec.env.clone(),
            }],
        }
    }

    fn new_task_service(&self, job: &ElasticJob, index: TaskIndex) -> Service {
        let labels = task_labels(&job.name, self.replica_type, index);
        Service {
            name: task_name(&job.name, self.replica_type, index),
            selector: labels.clone(),
            labels,
            port: self.port,
        }
    }

    fn task_service_addr(&self, job: &JobName, index: TaskIndex) -> String {
        service_addr(job, self.replica_type, index, self.port)
    }
}
