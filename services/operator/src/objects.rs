//! Task and service objects persisted in the object store.

use std::collections::BTreeMap;

use elasticjob_id::{JobName, ReplicaType, TaskIndex};
use elasticjob_reconcile::{PodPhase, RosterMember};
use serde::{Deserialize, Serialize};

/// Label carrying the owning job's name.
pub const LABEL_JOB_NAME: &str = "elasticjob-name";

/// Label carrying the replica type tag.
pub const LABEL_REPLICA_TYPE: &str = "replica-type";

/// Label carrying the task index.
pub const LABEL_REPLICA_INDEX: &str = "replica-index";

/// Name of the container the runtime payload is injected into.
pub const MAIN_CONTAINER: &str = "main";

/// An environment entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A container in a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

impl Container {
    /// Set an environment entry, replacing any existing entry of that name.
    pub fn set_env(&mut self, name: &str, value: String) {
        match self.env.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.value = value,
            None => self.env.push(EnvVar::new(name, value)),
        }
    }

    /// Look up an environment entry.
    pub fn env_value(&self, name: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }
}

/// A task (one worker process of a task group).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub phase: PodPhase,
    pub containers: Vec<Container>,
}

impl Pod {
    /// The task's index, if the index label is present and numeric.
    pub fn index(&self) -> Option<TaskIndex> {
        self.labels
            .get(LABEL_REPLICA_INDEX)
            .and_then(|v| TaskIndex::parse(v).ok())
    }
}

impl RosterMember for Pod {
    fn index_label(&self) -> Option<&str> {
        self.labels.get(LABEL_REPLICA_INDEX).map(String::as_str)
    }

    fn phase(&self) -> PodPhase {
        self.phase
    }
}

/// A stable network endpoint in front of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub selector: BTreeMap<String, String>,
    pub port: u16,
}

/// Equality-based label selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector(BTreeMap<String, String>);

impl LabelSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Selector for every task of one group of a job.
    pub fn for_group(job: &JobName, replica_type: ReplicaType) -> Self {
        Self::new()
            .with(LABEL_JOB_NAME, job.as_str())
            .with(LABEL_REPLICA_TYPE, replica_type.as_str())
    }

    /// Returns true if every selector entry is present in `labels`.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.0.iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}

/// Labels identifying the task at `index`.
pub fn task_labels(
    job: &JobName,
    replica_type: ReplicaType,
    index: TaskIndex,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(LABEL_JOB_NAME.to_string(), job.to_string());
    labels.insert(LABEL_REPLICA_TYPE.to_string(), replica_type.to_string());
    labels.insert(LABEL_REPLICA_INDEX.to_string(), index.to_string());
    labels
}
