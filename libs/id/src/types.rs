//! Name and index types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::NameError;

// =============================================================================
// Job Name
// =============================================================================

/// Validated name of an elastic training job.
///
/// Used as the namespacing prefix of every task and service the operator
/// creates for the job.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobName(String);

impl JobName {
    /// Maximum length, leaving room for the `-{type}-{index}` suffix inside
    /// a 63-character DNS label.
    pub const MAX_LEN: usize = 48;

    /// Parses and validates a job name.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }

        if s.len() > Self::MAX_LEN {
            return Err(NameError::TooLong {
                len: s.len(),
                max: Self::MAX_LEN,
            });
        }

        if let Some(ch) = s
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(NameError::InvalidCharacter {
                name: s.to_string(),
                ch,
            });
        }

        if s.starts_with('-') || s.ends_with('-') {
            return Err(NameError::InvalidBoundary(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for JobName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for JobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for JobName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for JobName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Replica Type
// =============================================================================

/// Role of a task group within a training job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaType {
    /// Parameter server: holds shared trainable state.
    Ps,
    /// Training worker.
    Worker,
    /// Chief worker.
    Chief,
    /// Evaluator.
    Evaluator,
}

impl ReplicaType {
    /// All known replica types.
    pub const ALL: [ReplicaType; 4] = [
        ReplicaType::Ps,
        ReplicaType::Worker,
        ReplicaType::Chief,
        ReplicaType::Evaluator,
    ];

    /// Canonical lowercase tag, used in names, labels, and `TF_CONFIG`.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReplicaType::Ps => "ps",
            ReplicaType::Worker => "worker",
            ReplicaType::Chief => "chief",
            ReplicaType::Evaluator => "evaluator",
        }
    }
}

impl fmt::Display for ReplicaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReplicaType {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| NameError::UnknownReplicaType(s.to_string()))
    }
}

// =============================================================================
// Task Index
// =============================================================================

/// Stable index of a task within its `(job, replica type)` group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TaskIndex(u32);

impl TaskIndex {
    /// Creates a task index.
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw index value.
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Parses an index from its label encoding.
    pub fn parse(s: &str) -> Result<Self, NameError> {
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| NameError::InvalidIndex(s.to_string()))
    }
}

impl fmt::Display for TaskIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskIndex {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<u32> for TaskIndex {
    fn from(value: u32) -> Self {
        Self(value)
    }
}
