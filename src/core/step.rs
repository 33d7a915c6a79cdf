//! Steps: the atomic unit of execution and failure reporting.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{error, info, warn, Instrument};

use crate::adapters::Runner;
use crate::domain::{truncate_for_log, EventType, StepResult, StepStatus};

use super::context::RunContext;

/// Longest captured output written to a single log line
const LOG_OUTPUT_LIMIT: usize = 4000;

/// One invocation of an external executable.
///
/// The executable is not checked when the step is defined; a missing or
/// non-executable file surfaces as a failed `StepResult` when it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    name: String,
    executable: PathBuf,
    args: Vec<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Command line as it is displayed in logs
    pub fn command_line(&self) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the step once through `runner`, logging and recording the outcome
    /// under the run's context.
    pub async fn execute(&self, runner: &dyn Runner, ctx: &RunContext) -> StepResult {
        self.execute_inner(runner, ctx)
            .instrument(ctx.span().clone())
            .await
    }

    async fn execute_inner(&self, runner: &dyn Runner, ctx: &RunContext) -> StepResult {
        ctx.record(ctx.event(
            Some(&self.name),
            EventType::StepStarted,
            format!("Running {}", self.command_line()),
            StepStatus::Running,
        ))
        .await;

        info!(step = %self.name, cmd = %self.command_line(), "Running step");

        let started = Instant::now();
        let result = runner.run(&self.executable, &self.args).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        self.log_result(&result, duration_ms);

        let event = if result.success() {
            ctx.event(
                Some(&self.name),
                EventType::StepCompleted,
                format!("Step '{}' completed in {}ms", self.name, duration_ms),
                StepStatus::Completed,
            )
        } else {
            ctx.event(
                Some(&self.name),
                EventType::StepFailed,
                format!("Step '{}' failed after {}ms", self.name, duration_ms),
                StepStatus::Failed,
            )
            .with_error(result.error().unwrap_or_default().to_string())
        };
        ctx.record(event.with_exit_code(result.exit_code()).with_duration(duration_ms))
            .await;

        result
    }

    fn log_result(&self, result: &StepResult, duration_ms: u64) {
        if !result.success() {
            error!(
                step = %self.name,
                exit_code = ?result.exit_code(),
                duration_ms,
                "Step failed"
            );
            if let Some(detail) = result.error() {
                error!(step = %self.name, "Error output:\n{}", truncate_for_log(detail, LOG_OUTPUT_LIMIT));
            }
            return;
        }

        info!(step = %self.name, duration_ms, "Step completed successfully");

        if !result.output().is_empty() {
            info!(
                step = %self.name,
                "stdout:\n{}",
                truncate_for_log(result.output(), LOG_OUTPUT_LIMIT)
            );
        }
        if !result.stderr().is_empty() {
            warn!(
                step = %self.name,
                "stderr:\n{}",
                truncate_for_log(result.stderr(), LOG_OUTPUT_LIMIT)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line() {
        let step = Step::new("gpa", "/opt/tools/bbextract", vec!["gpa".to_string()]);
        assert_eq!(step.command_line(), "/opt/tools/bbextract gpa");

        let step = Step::new("mailsync", "/opt/tools/mailsync", Vec::new());
        assert_eq!(step.command_line(), "/opt/tools/mailsync");
    }

    #[test]
    fn test_accessors() {
        let step = Step::new("parents", "bin/bbextract", vec!["parents".to_string()]);
        assert_eq!(step.name(), "parents");
        assert_eq!(step.executable(), Path::new("bin/bbextract"));
        assert_eq!(step.args(), ["parents".to_string()]);
    }
}
