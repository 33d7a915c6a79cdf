//! Run state and reconstruction from events.
//!
//! A Run is the view of one past or in-flight job execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{Event, EventType, StepStatus};

/// A job execution run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Name of the job being executed
    pub job_name: String,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if applicable)
    pub completed_at: Option<DateTime<Utc>>,

    /// Status of each step, in the order steps were first seen
    pub steps: Vec<(String, StepStatus)>,
}

impl Run {
    /// Reconstruct run state from a sequence of events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self {
            id: first_event.run_id,
            job_name: first_event.job_name.clone(),
            state: RunState::Running,
            started_at: first_event.timestamp,
            completed_at: None,
            steps: Vec::new(),
        };

        for event in events {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event to update run state
    pub fn apply_event(&mut self, event: &Event) {
        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
            }
            EventType::RunCompleted => {
                self.state = RunState::Succeeded;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    step: event.step.clone().unwrap_or_default(),
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
            EventType::StepStarted
            | EventType::StepCompleted
            | EventType::StepFailed
            | EventType::StepSkipped => {
                if let Some(ref step) = event.step {
                    self.set_step_status(step, event.status);
                }
            }
        }
    }

    fn set_step_status(&mut self, step: &str, status: StepStatus) {
        match self.steps.iter_mut().find(|(name, _)| name == step) {
            Some(entry) => entry.1 = status,
            None => self.steps.push((step.to_string(), status)),
        }
    }

    /// Status of a step, `None` if the run never mentioned it
    pub fn step_status(&self, step: &str) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|(name, _)| name == step)
            .map(|(_, status)| *status)
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }
}

/// State of a job run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing (or abandoned by a killed host process)
    #[default]
    Running,

    /// Every step succeeded
    Succeeded,

    /// Stopped at the first failing step
    Failed { step: String, error: String },
}
