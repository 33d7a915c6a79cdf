//! Per-run context handed to every job and step.
//!
//! A RunContext carries the run identity, the tracing span all of the
//! run's log lines are emitted under, and (optionally) the run's event
//! log. Each run owns its context; contexts are never shared between runs.

use std::path::Path;

use tracing::{info_span, warn, Span};
use uuid::Uuid;

use super::event_store::EventStore;
use crate::domain::{Event, EventType, StepStatus};

/// Identity and logging sink for one job run
#[derive(Debug)]
pub struct RunContext {
    run_id: Uuid,
    job_name: String,
    span: Span,
    events: Option<EventStore>,
}

impl RunContext {
    /// Create a context for a new run of `job_name`, logging only
    pub fn new(job_name: impl Into<String>) -> Self {
        let job_name = job_name.into();
        let run_id = Uuid::new_v4();
        let span = info_span!("job_run", job = %job_name, %run_id);

        Self {
            run_id,
            job_name,
            span,
            events: None,
        }
    }

    /// Also record this run's events under `runs_dir`.
    ///
    /// If the history directory cannot be created the run still proceeds,
    /// with a warning, and without history.
    pub async fn with_history(mut self, runs_dir: &Path) -> Self {
        match EventStore::open(runs_dir, self.run_id).await {
            Ok(store) => self.events = Some(store),
            Err(e) => {
                warn!(parent: &self.span, error = %e, "Run history disabled for this run");
            }
        }
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    /// Span every log line of this run is emitted under
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Event log of this run, if history is enabled
    pub fn event_store(&self) -> Option<&EventStore> {
        self.events.as_ref()
    }

    /// Build an event stamped with this run's identity
    pub fn event(
        &self,
        step: Option<&str>,
        event_type: EventType,
        summary: String,
        status: StepStatus,
    ) -> Event {
        Event::new(
            self.run_id,
            self.job_name.clone(),
            step.map(str::to_string),
            event_type,
            summary,
            status,
        )
    }

    /// Append an event to the run history. Write failures are logged and
    /// otherwise ignored; history never changes a run's outcome.
    pub async fn record(&self, event: Event) {
        if let Some(ref store) = self.events {
            if let Err(e) = store.append(&event).await {
                warn!(parent: &self.span, error = %e, event_type = ?event.event_type, "Failed to record run event");
            }
        }
    }
}
