//! Jobs: named, ordered chains of steps with short-circuit on failure.
//!
//! Step order encodes an implicit dependency chain: a step may rely on the
//! side effects of every step before it. A run therefore stops at the first
//! failing step, and nothing is retried or rolled back here.

use tracing::{error, info, Instrument};

use crate::adapters::Runner;
use crate::domain::{EventType, JobResult, StepStatus};

use super::context::RunContext;
use super::step::Step;

/// Progress of a single job run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    /// Executing the step at this index
    Running(usize),
    Succeeded,
    /// Stopped at the step at this index
    Failed(usize),
}

impl JobState {
    /// Leave `Pending` for a job with `step_count` steps
    pub fn start(self, step_count: usize) -> Self {
        match self {
            JobState::Pending if step_count == 0 => JobState::Succeeded,
            JobState::Pending => JobState::Running(0),
            other => other,
        }
    }

    /// Transition after the current step finished
    pub fn advance(self, step_succeeded: bool, step_count: usize) -> Self {
        match self {
            JobState::Running(i) if !step_succeeded => JobState::Failed(i),
            JobState::Running(i) if i + 1 < step_count => JobState::Running(i + 1),
            JobState::Running(_) => JobState::Succeeded,
            other => other,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_))
    }
}

/// A named business process executed as a strictly sequential chain of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    name: String,
    steps: Vec<Step>,
}

impl Job {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Run every step in declared order, stopping at the first failure.
    ///
    /// Step `i + 1` never starts before step `i` has finished and been
    /// evaluated.
    pub async fn run(&self, runner: &dyn Runner, ctx: &RunContext) -> JobResult {
        self.run_inner(runner, ctx)
            .instrument(ctx.span().clone())
            .await
    }

    async fn run_inner(&self, runner: &dyn Runner, ctx: &RunContext) -> JobResult {
        info!(steps = self.steps.len(), "Starting job");
        ctx.record(ctx.event(
            None,
            EventType::RunStarted,
            format!("Job '{}' started", self.name),
            StepStatus::Running,
        ))
        .await;

        let step_count = self.steps.len();
        let mut state = JobState::Pending.start(step_count);
        let mut results = Vec::with_capacity(step_count);

        while let JobState::Running(index) = state {
            let step = &self.steps[index];
            let result = step.execute(runner, ctx).await;
            let succeeded = result.success();
            results.push((step.name().to_string(), result));
            state = state.advance(succeeded, step_count);
        }

        match state {
            JobState::Failed(index) => {
                let failed = self.steps[index].name().to_string();
                self.record_skipped(ctx, index + 1).await;

                let error_msg = results
                    .last()
                    .and_then(|(_, r)| r.error())
                    .unwrap_or_default()
                    .to_string();
                error!(failed_step = %failed, skipped = step_count - index - 1, "Job failed");
                ctx.record(
                    ctx.event(
                        Some(&failed),
                        EventType::RunFailed,
                        format!("Job '{}' failed at step '{}'", self.name, failed),
                        StepStatus::Failed,
                    )
                    .with_error(error_msg),
                )
                .await;

                JobResult {
                    job_name: self.name.clone(),
                    success: false,
                    failed_step_name: Some(failed),
                    steps: results,
                }
            }
            _ => {
                info!("Job completed successfully");
                ctx.record(ctx.event(
                    None,
                    EventType::RunCompleted,
                    format!("Job '{}' completed", self.name),
                    StepStatus::Completed,
                ))
                .await;

                JobResult {
                    job_name: self.name.clone(),
                    success: true,
                    failed_step_name: None,
                    steps: results,
                }
            }
        }
    }

    async fn record_skipped(&self, ctx: &RunContext, from: usize) {
        for step in self.steps.iter().skip(from) {
            ctx.record(ctx.event(
                Some(step.name()),
                EventType::StepSkipped,
                format!("Step '{}' skipped after earlier failure", step.name()),
                StepStatus::Skipped,
            ))
            .await;
        }
    }
}
