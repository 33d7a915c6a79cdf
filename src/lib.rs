//! bbflow - recurring orchestrator for external data tools
//!
//! Runs a small set of named jobs on fixed intervals. Each job is an
//! ordered chain of steps, each step invoking an external executable (the
//! data-extraction tool or the mail-sync tool). A job stops at its first
//! failing step.
//!
//! # Architecture
//!
//! - Every process outcome, including failure to launch, is normalized into
//!   a `StepResult`; nothing below the job level returns an error for a
//!   misbehaving tool
//! - A `Job` walks its steps strictly in order and short-circuits on failure
//! - A `ScheduleRegistry` names the jobs and their intervals; the
//!   `Scheduler` drives them
//! - Every run has its own `RunContext` (run id, tracing span, event log)
//!
//! # Modules
//!
//! - `adapters`: Process execution (`Runner`, `ProcessRunner`)
//! - `core`: Steps, jobs, registry, catalog, scheduler, run history
//! - `domain`: Data structures (StepResult, JobResult, Event, Run)
//! - `config`: Configuration resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Serve the schedule
//! bbflow serve
//!
//! # Run one job now
//! bbflow run run_transcripts
//!
//! # Check a past run
//! bbflow status <run-id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{ProcessRunner, Runner};
pub use config::{Config, ToolPaths};
pub use crate::core::{Job, RunContext, ScheduleEntry, ScheduleRegistry, Scheduler, Step};
pub use domain::{JobResult, StepResult};
