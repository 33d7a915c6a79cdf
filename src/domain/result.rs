//! Normalized outcomes of step and job execution.
//!
//! A `StepResult` is produced exactly once per process invocation and covers
//! every way an invocation can end: clean exit, non-zero exit, a process that
//! could not be launched, a timeout, or a signal. Callers never see an `Err`
//! for any of these.

use serde::Serialize;

/// Message used when the executable cannot be started
pub const LAUNCH_FAILURE: &str = "executable not found or not runnable";

/// Outcome of a single process invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepResult {
    success: bool,
    output: String,
    error: Option<String>,
    exit_code: Option<i32>,
    stderr: String,
}

impl StepResult {
    /// Process exited with code 0. Stderr is kept as a diagnostic only.
    pub fn succeeded(output: String, stderr: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
            exit_code: Some(0),
            stderr,
        }
    }

    /// Process exited with a code. A zero code is treated as success.
    pub fn exited(code: i32, output: String, stderr: String) -> Self {
        if code == 0 {
            return Self::succeeded(output, stderr);
        }

        let error = if stderr.is_empty() {
            format!("non-zero exit (code {})", code)
        } else {
            stderr.clone()
        };

        Self {
            success: false,
            output,
            error: Some(error),
            exit_code: Some(code),
            stderr,
        }
    }

    /// Process could not be started at all
    pub fn launch_failed(detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref();
        let error = if detail.is_empty() {
            LAUNCH_FAILURE.to_string()
        } else {
            format!("{}: {}", LAUNCH_FAILURE, detail)
        };
        Self::failed(error)
    }

    /// Failure with no exit code (OS errors, timeouts, signals)
    pub fn failed(error: impl Into<String>) -> Self {
        let mut error = error.into();
        if error.is_empty() {
            error = "step failed".to_string();
        }

        Self {
            success: false,
            output: String::new(),
            error: Some(error),
            exit_code: None,
            stderr: String::new(),
        }
    }

    /// Attach whatever output was captured before a failure
    pub fn with_captured(mut self, output: String, stderr: String) -> Self {
        self.output = output;
        self.stderr = stderr;
        self
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Trimmed standard output
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Error detail; always `None` on success
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Trimmed standard error, including incidental stderr of successful runs
    pub fn stderr(&self) -> &str {
        &self.stderr
    }
}

/// Aggregate outcome of one job run
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    pub job_name: String,
    pub success: bool,
    pub failed_step_name: Option<String>,

    /// Results of the steps that actually ran, in execution order
    pub steps: Vec<(String, StepResult)>,
}

impl JobResult {
    /// Result for a step by name, if that step ran
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps
            .iter()
            .find(|(step_name, _)| step_name == name)
            .map(|(_, result)| result)
    }

    /// Names of the steps that ran, in order
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Truncate text for a log line without splitting a character
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}... [truncated]", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_has_no_error() {
        let result = StepResult::succeeded("done".into(), "deprecation notice".into());
        assert!(result.success());
        assert_eq!(result.error(), None);
        assert_eq!(result.exit_code(), Some(0));
        assert_eq!(result.stderr(), "deprecation notice");
    }

    #[test]
    fn test_exit_zero_is_success() {
        let result = StepResult::exited(0, String::new(), "noise".into());
        assert!(result.success());
        assert_eq!(result.error(), None);
    }

    #[test]
    fn test_non_zero_uses_stderr_as_error() {
        let result = StepResult::exited(2, "partial".into(), "db locked".into());
        assert!(!result.success());
        assert_eq!(result.exit_code(), Some(2));
        assert_eq!(result.error(), Some("db locked"));
        assert_eq!(result.output(), "partial");
    }

    #[test]
    fn test_non_zero_with_empty_stderr_synthesizes_message() {
        let result = StepResult::exited(7, String::new(), String::new());
        assert_eq!(result.error(), Some("non-zero exit (code 7)"));
    }

    #[test]
    fn test_launch_failure() {
        let result = StepResult::launch_failed("No such file or directory");
        assert!(!result.success());
        assert_eq!(result.exit_code(), None);
        assert!(result.error().unwrap().starts_with(LAUNCH_FAILURE));
    }

    #[test]
    fn test_failed_never_has_empty_error() {
        let result = StepResult::failed("");
        assert!(!result.error().unwrap().is_empty());
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        assert_eq!(truncate_for_log("abcdef", 3), "abc... [truncated]");
        // Multi-byte characters are never split
        assert_eq!(truncate_for_log("ééé", 2), "éé... [truncated]");
    }
}
