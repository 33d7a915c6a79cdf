//! Process runner for external executables.
//!
//! Launches the executable directly (never through a shell), with its
//! working directory set to the directory containing it, and converts
//! every outcome into a `StepResult`.

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::Runner;
use crate::domain::StepResult;

/// Runs one external process per invocation
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    /// Kill the child and fail the step after this long (no limit if unset)
    timeout: Option<Duration>,
}

impl ProcessRunner {
    /// Create a runner without a timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a runner that kills children running longer than `timeout`
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    /// Run `executable` with `args` and wait for it to exit.
    ///
    /// Both output streams are drained concurrently while waiting, so a
    /// chatty child cannot block on a full pipe.
    pub async fn run(&self, executable: &Path, args: &[String]) -> StepResult {
        if executable.as_os_str().is_empty() {
            return StepResult::launch_failed("executable path is empty");
        }

        let program = match absolute_program(executable) {
            Ok(program) => program,
            Err(e) => return StepResult::launch_failed(format!("{}: {}", executable.display(), e)),
        };

        let mut command = Command::new(&program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = working_dir(&program) {
            command.current_dir(dir);
        }

        debug!(executable = %program.display(), ?args, "Spawning process");

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return StepResult::launch_failed(format!("{}: {}", program.display(), e));
            }
        };

        // Dropping the wait future on timeout drops the child, which kills it.
        let waited = match self.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(waited) => waited,
                Err(_) => return StepResult::failed(timeout_message(limit)),
            },
            None => child.wait_with_output().await,
        };

        let output = match waited {
            Ok(output) => output,
            Err(e) => {
                return StepResult::failed(format!(
                    "failed to wait for {}: {}",
                    program.display(),
                    e
                ));
            }
        };

        let stdout = decode(&output.stdout);
        let stderr = decode(&output.stderr);

        debug!(
            executable = %program.display(),
            exit_code = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "Process exited"
        );

        match output.status.code() {
            Some(code) => StepResult::exited(code, stdout, stderr),
            None => StepResult::failed(describe_termination(output.status))
                .with_captured(stdout, stderr),
        }
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    fn name(&self) -> &str {
        "process"
    }

    async fn run(&self, executable: &Path, args: &[String]) -> StepResult {
        ProcessRunner::run(self, executable, args).await
    }
}

fn timeout_message(limit: Duration) -> String {
    format!("timed out after {}s", limit.as_secs_f64())
}

/// Decode captured bytes permissively and trim surrounding whitespace
fn decode(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// Resolve a relative path containing a directory against the current
/// directory, so it stays valid once the child's working directory changes.
/// Bare names are left alone for PATH lookup.
fn absolute_program(executable: &Path) -> io::Result<PathBuf> {
    if executable.is_absolute() || working_dir(executable).is_none() {
        return Ok(executable.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(executable))
}

/// Directory containing the executable, if the path names one
fn working_dir(executable: &Path) -> Option<&Path> {
    executable
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
}

#[cfg(unix)]
fn describe_termination(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => format!("terminated by signal {}", signal),
        None => "terminated without an exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_termination(_status: ExitStatus) -> String {
    "terminated without an exit code".to_string()
}
