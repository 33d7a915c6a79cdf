//! Adapter interfaces for external executables.
//!
//! Steps never launch processes themselves; they go through a `Runner`.
//! Production code uses `ProcessRunner`; tests substitute their own.

pub mod process;

use std::path::Path;

use async_trait::async_trait;

use crate::domain::StepResult;

pub use process::ProcessRunner;

/// Trait for anything that can execute a step's command
#[async_trait]
pub trait Runner: Send + Sync {
    /// Human-readable runner name
    fn name(&self) -> &str;

    /// Execute `executable` with `args`. Never fails: every outcome,
    /// including a launch failure, is a `StepResult`.
    async fn run(&self, executable: &Path, args: &[String]) -> StepResult;
}
