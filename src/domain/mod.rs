//! Domain types for the bbflow orchestrator.
//!
//! This module contains the core data structures:
//! - StepResult / JobResult: normalized execution outcomes
//! - Events: Immutable records of run history
//! - Run: State of a job run derived from its events

pub mod events;
pub mod result;
pub mod run;

// Re-export commonly used types
pub use events::{Event, EventType, StepStatus};
pub use result::{truncate_for_log, JobResult, StepResult, LAUNCH_FAILURE};
pub use run::{Run, RunState};
