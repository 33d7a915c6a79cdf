//! Core orchestration logic.
//!
//! This module contains:
//! - Step / Job: sequential execution with short-circuit on failure
//! - RunContext: per-run identity and logging sink
//! - ScheduleRegistry: named jobs and their intervals
//! - Catalog: the built-in job definitions
//! - Scheduler: local interval driver
//! - EventStore: append-only run history

pub mod catalog;
pub mod context;
pub mod event_store;
pub mod job;
pub mod registry;
pub mod scheduler;
pub mod step;

// Re-export commonly used types
pub use catalog::{build_registry, ExtractMode, JobDefinition, Tool, BUILTIN_JOBS};
pub use context::RunContext;
pub use event_store::EventStore;
pub use job::{Job, JobState};
pub use registry::{RegistryError, ScheduleEntry, ScheduleRegistry, MAX_INTERVAL_SECONDS};
pub use scheduler::Scheduler;
pub use step::Step;
