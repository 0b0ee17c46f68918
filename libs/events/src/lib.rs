//! # elasticjob-events
//!
//! Event records emitted by the elasticjob operator.
//!
//! ## Design Principles
//!
//! - Events are attached to the job they concern (the subject)
//! - Events carry a severity, a machine-readable reason, and a human message
//! - Events are observations, never commands: dropping one must not change
//!   reconciliation outcomes
//!
//! ## Event Shape
//!
//! `(subject, type, reason, message)` plus the time it was recorded.

mod envelope;
mod error;
mod types;

pub use envelope::*;
pub use error::EventError;
pub use types::*;
