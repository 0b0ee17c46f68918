//! Event recording.
//!
//! Events are attached to jobs so users can see why a task group is not at
//! its desired size. Recording never fails from the caller's point of view.

use std::sync::{Mutex, PoisonError};

use elasticjob_events::{EventType, JobEvent};
use tracing::{info, warn};

/// Sink for job events.
pub trait EventRecorder: Send + Sync {
    /// Record an event.
    fn record(&self, event: JobEvent);
}

/// Recorder that logs every event and keeps it in memory.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    events: Mutex<Vec<JobEvent>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events recorded so far.
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Warning events recorded so far.
    pub fn warnings(&self) -> Vec<JobEvent> {
        self.events()
            .into_iter()
            .filter(JobEvent::is_warning)
            .collect()
    }
}

impl EventRecorder for MemoryRecorder {
    fn record(&self, event: JobEvent) {
        match event.event_type {
            EventType::Warning => warn!(
                job = %event.subject,
                reason = %event.reason,
                message = %event.message,
                "Job event"
            ),
            EventType::Normal => info!(
                job = %event.subject,
                reason = %event.reason,
                message = %event.message,
                "Job event"
            ),
        }

        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}
