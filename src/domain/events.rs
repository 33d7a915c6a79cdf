//! Run history events.
//!
//! Every job run appends events to its own JSONL log. Events are never
//! rewritten; the state of a past run is derived by replaying them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in a run's event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this event belongs to
    pub run_id: Uuid,

    /// Name of the job being run
    pub job_name: String,

    /// Step name (if applicable)
    pub step: Option<String>,

    /// Type of event
    pub event_type: EventType,

    /// Human-readable summary
    pub summary: String,

    /// Current status of the step/run
    pub status: StepStatus,

    /// Exit code of the step's process, when it produced one
    #[serde(default)]
    pub exit_code: Option<i32>,

    /// Time taken in milliseconds (for finished steps)
    #[serde(default)]
    pub duration_ms: Option<u64>,

    /// Error message if failed
    #[serde(default)]
    pub error: Option<String>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        run_id: Uuid,
        job_name: impl Into<String>,
        step: Option<String>,
        event_type: EventType,
        summary: String,
        status: StepStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            job_name: job_name.into(),
            step,
            event_type,
            summary,
            status,
            exit_code: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_exit_code(mut self, exit_code: Option<i32>) -> Self {
        self.exit_code = exit_code;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Types of events that can occur during a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A new run has started
    RunStarted,

    /// Every step succeeded
    RunCompleted,

    /// A step failed and the run stopped
    RunFailed,

    /// A step's process is being launched
    StepStarted,

    /// A step's process exited 0
    StepCompleted,

    /// A step failed to launch or exited non-zero
    StepFailed,

    /// A step was not run because an earlier step failed
    StepSkipped,
}

/// Status of a step or run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started
    #[default]
    Pending,

    /// Currently executing
    Running,

    /// Completed successfully
    Completed,

    /// Failed (with error)
    Failed,

    /// Not run because an earlier step failed
    Skipped,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            Uuid::new_v4(),
            "run_transcripts",
            Some("gpa".to_string()),
            EventType::StepStarted,
            "Starting gpa".to_string(),
            StepStatus::Running,
        );

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"step_started\""));

        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_type, EventType::StepStarted);
        assert_eq!(parsed.status, StepStatus::Running);
        assert_eq!(parsed.job_name, "run_transcripts");
    }

    #[test]
    fn test_event_with_exit_code_and_error() {
        let event = Event::new(
            Uuid::new_v4(),
            "run_transcripts",
            Some("gpa".to_string()),
            EventType::StepFailed,
            "gpa failed".to_string(),
            StepStatus::Failed,
        )
        .with_exit_code(Some(2))
        .with_duration(1500)
        .with_error("db locked".to_string());

        assert_eq!(event.exit_code, Some(2));
        assert_eq!(event.duration_ms, Some(1500));
        assert_eq!(event.error.as_deref(), Some("db locked"));
    }

    #[test]
    fn test_optional_fields_default_when_absent() {
        let json = format!(
            r#"{{"id":"{}","timestamp":"2026-01-01T00:00:00Z","run_id":"{}","job_name":"run_mailsync","step":null,"event_type":"run_started","summary":"started","status":"running"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let event: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event.exit_code, None);
        assert_eq!(event.error, None);
    }
}
