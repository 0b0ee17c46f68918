//! # elasticjob-id
//!
//! Typed names for the elasticjob operator.
//!
//! ## Design Principles
//!
//! - Job names are user-controlled but validated once, at the boundary
//! - Every derived object name is built from `(job, replica type, index)`
//! - Replica types are a closed set with a canonical lowercase tag
//!
//! ## Name Format
//!
//! Job names follow DNS-1123 label rules so that every derived task and
//! service name stays addressable:
//! - `train-a`
//! - `ctr-model-2024`

mod error;
mod types;

pub use error::NameError;
pub use types::*;
