//! Job controller.
//!
//! The controller walks every job in the store, refreshes each task group's
//! status from the tasks that exist, and hands each group with a desired
//! spec to its replica manager.

mod dispatcher;
mod worker;

pub use dispatcher::{JobController, ReconcileStats};
pub use worker::ControllerWorker;
