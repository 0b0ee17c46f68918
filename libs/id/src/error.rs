//! Error types for name parsing and validation.

use thiserror::Error;

/// Errors that can occur when parsing or validating names.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NameError {
    /// The name is empty.
    #[error("name cannot be empty")]
    Empty,

    /// The name is longer than a DNS label allows.
    #[error("name too long: {len} characters (max {max})")]
    TooLong { len: usize, max: usize },

    /// The name contains a character outside `[a-z0-9-]`.
    #[error("invalid character {ch:?} in name '{name}'")]
    InvalidCharacter { name: String, ch: char },

    /// The name starts or ends with a hyphen.
    #[error("name must start and end with an alphanumeric character: '{0}'")]
    InvalidBoundary(String),

    /// The replica type tag is not known.
    #[error("unknown replica type: {0}")]
    UnknownReplicaType(String),

    /// The task index is not a non-negative integer.
    #[error("invalid task index: {0}")]
    InvalidIndex(String),
}

impl NameError {
    /// Returns true if this error indicates the input was empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, NameError::Empty)
    }
}
