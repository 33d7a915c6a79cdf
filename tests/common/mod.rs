//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bbflow::{Runner, StepResult, ToolPaths};
use tokio::time::sleep;

pub fn tool_paths() -> ToolPaths {
    ToolPaths {
        extractor: PathBuf::from("/opt/bb/bbextract"),
        mailsync: PathBuf::from("/opt/bb/mailsync"),
    }
}

/// Runner that records invocations and returns scripted results.
///
/// An invocation is keyed by its first argument (the extractor mode) or,
/// with no arguments, by the executable's file name. Unscripted
/// invocations succeed.
#[derive(Default)]
pub struct ScriptedRunner {
    outcomes: HashMap<String, StepResult>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, key: &str, result: StepResult) -> Self {
        self.outcomes.insert(key.to_string(), result);
        self
    }

    /// Invocation keys, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

fn invocation_key(executable: &Path, args: &[String]) -> String {
    match args.first() {
        Some(mode) => mode.clone(),
        None => executable
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run(&self, executable: &Path, args: &[String]) -> StepResult {
        let key = invocation_key(executable, args);
        self.calls.lock().unwrap().push(key.clone());

        self.outcomes
            .get(&key)
            .cloned()
            .unwrap_or_else(|| StepResult::succeeded(format!("{} done", key), String::new()))
    }
}

/// Runner whose invocations take `delay` and that tracks how many are in
/// flight at once
pub struct SlowRunner {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

impl SlowRunner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most invocations ever running at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Runner for SlowRunner {
    fn name(&self) -> &str {
        "slow"
    }

    async fn run(&self, _executable: &Path, _args: &[String]) -> StepResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        StepResult::succeeded(String::new(), String::new())
    }
}

/// Runner that replaces `runs_dir` with a plain file before succeeding, so
/// every later history write of the run fails
pub struct HistoryBreakingRunner {
    pub runs_dir: PathBuf,
}

#[async_trait]
impl Runner for HistoryBreakingRunner {
    fn name(&self) -> &str {
        "history-breaking"
    }

    async fn run(&self, _executable: &Path, _args: &[String]) -> StepResult {
        std::fs::remove_dir_all(&self.runs_dir).unwrap();
        std::fs::write(&self.runs_dir, "not a directory").unwrap();
        StepResult::succeeded("done".to_string(), String::new())
    }
}
