//! Elastic job resource.
//!
//! The job carries the desired size of each task group and a status summary
//! of the tasks that exist for it. The operator only reads the spec; status
//! is refreshed from the store before each reconciliation.

use std::collections::BTreeMap;

use elasticjob_id::{JobName, ReplicaType};
use elasticjob_reconcile::ReplicaStatus;
use serde::{Deserialize, Serialize};

use crate::objects::EnvVar;

/// Desired state of one task group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaResourceSpec {
    /// Desired number of alive tasks.
    pub replicas: u32,

    /// Container image for the group's tasks.
    #[serde(default)]
    pub image: String,

    /// Entrypoint command.
    #[serde(default)]
    pub command: Vec<String>,

    /// Extra environment entries for the main container.
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

/// Observed state of a job, per task group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    #[serde(default)]
    pub replica_statuses: BTreeMap<ReplicaType, ReplicaStatus>,
}

impl JobStatus {
    /// Status of one task group; empty if nothing was observed yet.
    pub fn replica(&self, replica_type: ReplicaType) -> ReplicaStatus {
        self.replica_statuses
            .get(&replica_type)
            .copied()
            .unwrap_or_default()
    }
}

/// A distributed training job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticJob {
    pub name: JobName,

    #[serde(default)]
    pub replica_specs: BTreeMap<ReplicaType, ReplicaResourceSpec>,

    #[serde(default)]
    pub status: JobStatus,
}

impl ElasticJob {
    /// Creates a job with no task groups.
    pub fn new(name: JobName) -> Self {
        Self {
            name,
            replica_specs: BTreeMap::new(),
            status: JobStatus::default(),
        }
    }

    /// Sets the desired spec of one task group.
    pub fn with_replicas(mut self, replica_type: ReplicaType, spec: ReplicaResourceSpec) -> Self {
        self.replica_specs.insert(replica_type, spec);
        self
    }

    /// Sets the observed status of one task group.
    pub fn with_status(mut self, replica_type: ReplicaType, status: ReplicaStatus) -> Self {
        self.status.replica_statuses.insert(replica_type, status);
        self
    }
}
