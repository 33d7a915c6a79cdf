//! Command-line interface for bbflow.
//!
//! Provides commands for serving the schedule, running a job once,
//! listing jobs and recorded runs, and showing the resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use crate::adapters::ProcessRunner;
use crate::config::Config;
use crate::core::{build_registry, EventStore, Scheduler};
use crate::domain::{Run, RunState};

/// bbflow - recurring orchestrator for the extraction and mail-sync tools
#[derive(Parser, Debug)]
#[command(name = "bbflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .bbflow/config.yaml in this or a parent directory)
    #[arg(short, long, global = true, env = "BBFLOW_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run every job on its schedule until interrupted
    Serve,

    /// Run one job now
    Run {
        /// Job name (e.g. run_transcripts)
        job_name: String,
    },

    /// List scheduled jobs and their steps
    Jobs,

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Check the status of a run
    Status {
        /// Run ID (UUID)
        run_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve => serve(&config).await,
            Commands::Run { job_name } => run_job(&config, &job_name).await,
            Commands::Jobs => list_jobs(&config),
            Commands::Runs { limit } => list_runs(&config, limit).await,
            Commands::Status { run_id } => show_status(&config, &run_id).await,
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
        }
    }
}

fn scheduler(config: &Config) -> Result<Scheduler> {
    let registry = build_registry(config).context("Invalid job configuration")?;
    let runner = Arc::new(ProcessRunner::with_timeout(config.step_timeout));

    Ok(Scheduler::new(registry, runner)
        .with_history(config.runs_dir())
        .run_on_start(config.run_on_start))
}

/// Drive the schedule until Ctrl-C
async fn serve(config: &Config) -> Result<()> {
    let scheduler = scheduler(config)?;
    info!(jobs = scheduler.registry().len(), "Scheduler started");

    scheduler
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await;

    Ok(())
}

/// Run a single job and report its outcome
async fn run_job(config: &Config, job_name: &str) -> Result<()> {
    let scheduler = scheduler(config)?;
    let result = scheduler.run_job(job_name).await?;

    for (name, step) in &result.steps {
        let status = if step.success() { "ok" } else { "FAILED" };
        match step.exit_code() {
            Some(code) => println!("  {:<14} {:<7} exit {}", name, status, code),
            None => println!("  {:<14} {:<7} {}", name, status, step.error().unwrap_or_default()),
        }
    }

    if let Some(failed) = &result.failed_step_name {
        eprintln!("\n[Job {} failed at step '{}']", result.job_name, failed);
        std::process::exit(1);
    }

    eprintln!("\n[Job {} completed successfully]", result.job_name);
    Ok(())
}

/// Print the schedule
fn list_jobs(config: &Config) -> Result<()> {
    let registry = build_registry(config).context("Invalid job configuration")?;

    println!("{:<20} {:>10}  STEPS", "JOB", "INTERVAL");
    println!("{}", "-".repeat(60));

    for (entry, job) in registry.iter() {
        let steps: Vec<&str> = job.steps().iter().map(|s| s.name()).collect();
        println!(
            "{:<20} {:>9}s  {}",
            entry.job_name,
            entry.interval_seconds,
            steps.join(" -> ")
        );
    }

    Ok(())
}

/// Show the status of one recorded run
async fn show_status(config: &Config, run_id_str: &str) -> Result<()> {
    let run_id = Uuid::parse_str(run_id_str)
        .with_context(|| format!("Invalid run ID: {}", run_id_str))?;

    let run = load_run(config, run_id)
        .await?
        .with_context(|| format!("Run {} not found", run_id))?;

    println!("Run ID:     {}", run.id);
    println!("Job:        {}", run.job_name);
    println!("State:      {}", describe_state(&run.state));
    println!("Started:    {}", run.started_at);
    if let Some(completed) = run.completed_at {
        println!("Completed:  {}", completed);
    }

    println!("\nSteps:");
    for (name, status) in &run.steps {
        println!("  {:<14} {:?}", name, status);
    }

    Ok(())
}

/// List recorded runs, most recent first
async fn list_runs(config: &Config, limit: usize) -> Result<()> {
    let runs_dir = config.runs_dir();
    let mut runs = Vec::new();

    for run_id in EventStore::list_runs(&runs_dir).await? {
        if let Ok(Some(run)) = load_run(config, run_id).await {
            runs.push(run);
        }
    }

    if runs.is_empty() {
        println!("No runs found.");
        return Ok(());
    }

    runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));

    println!("{:<38} {:<18} {:<28} STARTED", "RUN ID", "JOB", "STATE");
    println!("{}", "-".repeat(110));

    for run in runs.into_iter().take(limit) {
        println!(
            "{:<38} {:<18} {:<28} {}",
            run.id,
            run.job_name,
            describe_state(&run.state),
            run.started_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}

async fn load_run(config: &Config, run_id: Uuid) -> Result<Option<Run>> {
    let events = EventStore::at(&config.runs_dir(), run_id).replay().await?;
    Ok(Run::from_events(&events))
}

fn describe_state(state: &RunState) -> String {
    match state {
        RunState::Running => "running".to_string(),
        RunState::Succeeded => "succeeded".to_string(),
        RunState::Failed { step, .. } => format!("failed at {}", step),
    }
}

/// Print the resolved configuration
fn show_config(config: &Config) {
    println!("bbflow Configuration");
    println!("{}", "=".repeat(50));
    println!();

    match &config.config_file {
        Some(path) => println!("Config file:    {}", path.display()),
        None => println!("Config file:    (none, using defaults)"),
    }
    println!("Extractor:      {}", config.tools.extractor.display());
    println!("Mail sync:      {}", config.tools.mailsync.display());
    println!("Home:           {}", config.home.display());
    println!("Runs:           {}", config.runs_dir().display());
    match config.step_timeout {
        Some(timeout) => println!("Step timeout:   {}s", timeout.as_secs()),
        None => println!("Step timeout:   (none)"),
    }
    println!("Run on start:   {}", config.run_on_start);
}
