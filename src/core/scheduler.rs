//! Local interval driver for registered jobs.
//!
//! Each schedule entry gets its own task ticking at the entry's interval.
//! A job's runs never overlap (the next tick waits for the current run and
//! missed ticks are skipped); different jobs run concurrently, each with its
//! own RunContext.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::adapters::Runner;
use crate::domain::JobResult;

use super::context::RunContext;
use super::job::Job;
use super::registry::{RegistryError, ScheduleRegistry};

/// Drives the jobs in a registry on their intervals
pub struct Scheduler {
    registry: Arc<ScheduleRegistry>,
    runner: Arc<dyn Runner>,
    /// Where run history is written; none if unset
    runs_dir: Option<PathBuf>,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(registry: ScheduleRegistry, runner: Arc<dyn Runner>) -> Self {
        Self {
            registry: Arc::new(registry),
            runner,
            runs_dir: None,
            run_on_start: false,
        }
    }

    /// Record every run's events under `runs_dir`
    pub fn with_history(mut self, runs_dir: PathBuf) -> Self {
        self.runs_dir = Some(runs_dir);
        self
    }

    /// Run each job immediately instead of after its first interval
    pub fn run_on_start(mut self, run_on_start: bool) -> Self {
        self.run_on_start = run_on_start;
        self
    }

    pub fn registry(&self) -> &ScheduleRegistry {
        &self.registry
    }

    /// Run one registered job once, outside its schedule
    pub async fn run_job(&self, name: &str) -> Result<JobResult, RegistryError> {
        let job = self.registry.job(name)?;
        Ok(execute(&job, self.runner.as_ref(), self.runs_dir.as_deref()).await)
    }

    /// Drive every registered job until `shutdown` resolves.
    ///
    /// Runs still in flight at shutdown are abandoned; their child
    /// processes are killed and they produce no JobResult.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        info!(runner = self.runner.name(), "Starting job schedule");

        for (entry, job) in self.registry.iter() {
            let job = Arc::clone(job);
            let runner = Arc::clone(&self.runner);
            let runs_dir = self.runs_dir.clone();
            let period = Duration::from_secs(entry.interval_seconds);
            let start = if self.run_on_start {
                Instant::now()
            } else {
                Instant::now() + period
            };

            info!(
                job = %entry.job_name,
                interval_seconds = entry.interval_seconds,
                "Scheduling job"
            );

            tasks.spawn(async move {
                let mut ticker = interval_at(start, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    ticker.tick().await;
                    execute(&job, runner.as_ref(), runs_dir.as_deref()).await;
                }
            });
        }

        shutdown.await;
        info!(jobs = tasks.len(), "Shutting down scheduler");
        tasks.shutdown().await;
    }
}

/// One run of `job` with a fresh context
async fn execute(job: &Job, runner: &dyn Runner, runs_dir: Option<&Path>) -> JobResult {
    let mut ctx = RunContext::new(job.name());
    if let Some(dir) = runs_dir {
        ctx = ctx.with_history(dir).await;
    }

    let result = job.run(runner, &ctx).await;
    if !result.success {
        warn!(
            job = %job.name(),
            run_id = %ctx.run_id(),
            failed_step = ?result.failed_step_name,
            "Run finished with a failed step"
        );
    }
    result
}
