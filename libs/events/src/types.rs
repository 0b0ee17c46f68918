//! Event severities and reasons.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum EventType {
    /// Informational.
    #[default]
    Normal,
    /// Something went wrong and may need attention.
    Warning,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Normal => write!(f, "Normal"),
            EventType::Warning => write!(f, "Warning"),
        }
    }
}

/// Machine-readable reason attached to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventReason {
    /// A task object could not be created.
    PodFailed,
    /// A task's service object could not be created.
    ServiceFailed,
    /// A task and its service were created.
    Created,
}

impl fmt::Display for EventReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventReason::PodFailed => "Failed",
            EventReason::ServiceFailed => "ServiceFailed",
            EventReason::Created => "Created",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_display() {
        assert_eq!(EventType::Normal.to_string(), "Normal");
        assert_eq!(EventType::Warning.to_string(), "Warning");
    }

    #[test]
    fn test_pod_failed_uses_phase_name() {
        assert_eq!(EventReason::PodFailed.to_string(), "Failed");
    }
}
