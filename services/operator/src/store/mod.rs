//! Object store interface.
//!
//! The store holds jobs, tasks, and services. Creates are keyed by object
//! name: creating an object whose name is already taken fails with
//! [`StoreError::AlreadyExists`], which is what makes a retried scale-up
//! pass safe.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use elasticjob_id::JobName;
use thiserror::Error;

use crate::job::{ElasticJob, JobStatus};
use crate::objects::{LabelSelector, Pod, Service};

/// Kind of stored object, for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Job,
    Pod,
    Service,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectKind::Job => write!(f, "job"),
            ObjectKind::Pod => write!(f, "pod"),
            ObjectKind::Service => write!(f, "service"),
        }
    }
}

/// Object store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An object with this name already exists.
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ObjectKind, name: String },

    /// The object does not exist.
    #[error("{kind} {name} not found")]
    NotFound { kind: ObjectKind, name: String },

    /// The store could not be reached or refused the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Returns true if the error reports a name collision.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}

/// Persistent store of jobs, tasks, and services.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List all jobs.
    async fn list_jobs(&self) -> Result<Vec<ElasticJob>, StoreError>;

    /// Overwrite a job's status.
    async fn update_job_status(&self, job: &JobName, status: JobStatus)
        -> Result<(), StoreError>;

    /// Create a task.
    async fn create_pod(&self, pod: Pod) -> Result<(), StoreError>;

    /// List tasks whose labels match `selector`.
    async fn list_pods(&self, selector: &LabelSelector) -> Result<Vec<Pod>, StoreError>;

    /// Create a service.
    async fn create_service(&self, service: Service) -> Result<(), StoreError>;

    /// List services whose labels match `selector`.
    async fn list_services(&self, selector: &LabelSelector) -> Result<Vec<Service>, StoreError>;
}
