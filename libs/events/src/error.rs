//! Error types for event construction.

use thiserror::Error;

/// Errors that can occur when building events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// A required field was not set on the builder.
    #[error("missing required event field: {0}")]
    MissingField(&'static str),
}
