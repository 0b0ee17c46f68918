//! Replica managers.
//!
//! A replica manager converges one task group (parameter servers, workers)
//! of a job toward its desired size. Managers are looked up by replica type
//! in a [`ReplicaManagers`] registry built once at startup and handed to the
//! controller.
//!
//! Each `reconcile_pods` call is a fresh computation from the job's status
//! snapshot and holds no state between calls. Callers must not reconcile the
//! same job's same group concurrently.

mod ps;
mod scale;
mod task;
mod worker;

pub use ps::PsManager;
pub use task::{TaskGroup, TaskSet};
pub use worker::WorkerManager;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use elasticjob_id::ReplicaType;
use elasticjob_reconcile::{PayloadError, RosterMode};
use thiserror::Error;

use crate::job::{ElasticJob, ReplicaResourceSpec};
use crate::recorder::EventRecorder;
use crate::store::{ObjectStore, StoreError};

/// Result type for replica reconciliation.
pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Errors returned by a reconciliation pass.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to create pod {name}: {source}")]
    CreatePod {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to create service {name}: {source}")]
    CreateService {
        name: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to list objects: {source}")]
    List {
        #[source]
        source: StoreError,
    },

    #[error("failed to update status of job {job}: {source}")]
    UpdateStatus {
        job: String,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("pod {0} has no container to configure")]
    NoContainer(String),

    #[error("no replica manager registered for {0}")]
    UnknownReplicaType(ReplicaType),
}

impl ReconcileError {
    /// The store error underneath, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            ReconcileError::CreatePod { source, .. }
            | ReconcileError::CreateService { source, .. }
            | ReconcileError::List { source }
            | ReconcileError::UpdateStatus { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Collaborators a reconciliation pass talks to.
#[derive(Clone)]
pub struct ReconcileContext {
    pub store: Arc<dyn ObjectStore>,
    pub recorder: Arc<dyn EventRecorder>,
}

impl ReconcileContext {
    pub fn new(store: Arc<dyn ObjectStore>, recorder: Arc<dyn EventRecorder>) -> Self {
        Self { store, recorder }
    }
}

/// Converges one task group of a job.
#[async_trait]
pub trait ReplicaManager: Send + Sync {
    /// The task group this manager handles.
    fn replica_type(&self) -> ReplicaType;

    /// Create whatever tasks the group is missing.
    ///
    /// Returns `Ok(())` on success or when nothing needed doing, and the
    /// first persist failure otherwise. Failed passes are retried by the
    /// caller on the next trigger.
    async fn reconcile_pods(
        &self,
        ctx: &ReconcileContext,
        job: &ElasticJob,
        spec: &ReplicaResourceSpec,
    ) -> ReconcileResult<()>;
}

/// Replica managers keyed by the task group they handle.
#[derive(Clone, Default)]
pub struct ReplicaManagers {
    managers: BTreeMap<ReplicaType, Arc<dyn ReplicaManager>>,
}

impl ReplicaManagers {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the parameter server and worker managers.
    pub fn with_defaults(roster_mode: RosterMode) -> Self {
        let mut managers = Self::new();
        managers.register(Arc::new(PsManager::new(roster_mode)));
        managers.register(Arc::new(WorkerManager::new(roster_mode)));
        managers
    }

    /// Register a manager, replacing any previous one for its replica type.
    pub fn register(&mut self, manager: Arc<dyn ReplicaManager>) {
        self.managers.insert(manager.replica_type(), manager);
    }

    /// Look up the manager for a replica type.
    pub fn get(&self, replica_type: ReplicaType) -> Option<&Arc<dyn ReplicaManager>> {
        self.managers.get(&replica_type)
    }

    /// Registered replica types.
    pub fn replica_types(&self) -> impl Iterator<Item = ReplicaType> + '_ {
        self.managers.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let managers = ReplicaManagers::with_defaults(RosterMode::Snapshot);
        let types: Vec<_> = managers.replica_types().collect();
        assert_eq!(types, vec![ReplicaType::Ps, ReplicaType::Worker]);
        assert!(managers.get(ReplicaType::Chief).is_none());
    }

    #[test]
    fn test_store_error_is_exposed() {
        let err = ReconcileError::CreatePod {
            name: "train-a-ps-0".to_string(),
            source: StoreError::Unavailable("timeout".to_string()),
        };
        assert_eq!(
            err.store_error(),
            Some(&StoreError::Unavailable("timeout".to_string()))
        );
        assert!(ReconcileError::NoContainer("x".to_string()).store_error().is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut managers = ReplicaManagers::new();
        managers.register(Arc::new(PsManager::new(RosterMode::Snapshot)));
        managers.register(Arc::new(PsManager::new(RosterMode::Incremental)));
        assert_eq!(managers.replica_types().count(), 1);
    }
}
