//! Job event record and its builder.

use chrono::{DateTime, Utc};
use elasticjob_id::JobName;
use serde::{Deserialize, Serialize};

use crate::{EventError, EventReason, EventType};

/// An event recorded against a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// The job the event concerns.
    pub subject: JobName,

    /// Severity.
    pub event_type: EventType,

    /// Machine-readable reason.
    pub reason: EventReason,

    /// Human-readable message.
    pub message: String,

    /// When the event was recorded.
    pub occurred_at: DateTime<Utc>,
}

impl JobEvent {
    /// Creates a new event builder.
    pub fn builder() -> JobEventBuilder {
        JobEventBuilder::new()
    }

    /// Shorthand for a warning event.
    pub fn warning(subject: JobName, reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            subject,
            event_type: EventType::Warning,
            reason,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Shorthand for an informational event.
    pub fn normal(subject: JobName, reason: EventReason, message: impl Into<String>) -> Self {
        Self {
            subject,
            event_type: EventType::Normal,
            reason,
            message: message.into(),
            occurred_at: Utc::now(),
        }
    }

    /// Returns true for warning events.
    pub fn is_warning(&self) -> bool {
        self.event_type == EventType::Warning
    }
}

/// Builder for constructing job events.
#[derive(Debug, Default)]
pub struct JobEventBuilder {
    subject: Option<JobName>,
    event_type: EventType,
    reason: Option<EventReason>,
    message: Option<String>,
    occurred_at: Option<DateTime<Utc>>,
}

impl JobEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subject(mut self, subject: JobName) -> Self {
        self.subject = Some(subject);
        self
    }

    pub fn event_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn reason(mut self, reason: EventReason) -> Self {
        self.reason = Some(reason);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn occurred_at(mut self, ts: DateTime<Utc>) -> Self {
        self.occurred_at = Some(ts);
        self
    }

    /// Builds the event.
    ///
    /// `subject` and `reason` are required; the message defaults to empty
    /// and the timestamp to now.
    pub fn build(self) -> Result<JobEvent, EventError> {
        Ok(JobEvent {
            subject: self.subject.ok_or(EventError::MissingField("subject"))?,
            event_type: self.event_type,
            reason: self.reason.ok_or(EventError::MissingField("reason"))?,
            message: self.message.unwrap_or_default(),
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
        })
    }
}
