//! elasticjob operator library.
//!
//! The operator converges the task groups of elastic training jobs toward
//! their desired size. For each missing task it creates the task and a
//! companion service, and hands the task the roster of its live peers in
//! `TF_CONFIG`.
//!
//! ## Modules
//!
//! - `replica`: replica managers (parameter servers, workers) and the task factory
//! - `controller`: dispatch of jobs to managers, and the periodic worker
//! - `store`: object store interface and in-memory implementation
//! - `recorder`: job event sink

pub mod config;
pub mod controller;
pub mod job;
pub mod objects;
pub mod recorder;
pub mod replica;
pub mod store;

pub use controller::{ControllerWorker, JobController};
pub use job::{ElasticJob, JobStatus, ReplicaResourceSpec};
pub use recorder::{EventRecorder, MemoryRecorder};
pub use replica::{ReconcileContext, ReconcileError, ReplicaManager, ReplicaManagers};
pub use store::{MemoryStore, ObjectStore, StoreError};
