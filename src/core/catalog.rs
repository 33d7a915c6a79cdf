//! Job catalog: the fixed mapping from jobs to tool invocations.
//!
//! The extraction tool takes a single mode argument; the mail-sync tool
//! takes none. Built-in jobs are static data. Additional jobs can be
//! declared in the config file using the same model:
//!
//! ```yaml
//! jobs:
//!   - name: run_enrollment
//!     interval_seconds: 43200
//!     steps:
//!       - tool: extractor
//!         mode: enrollment
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::Job;
use super::registry::{RegistryError, ScheduleRegistry};
use super::step::Step;
use crate::config::{Config, ToolPaths};

/// Default recurrence: once per day
pub const DEFAULT_INTERVAL_SECONDS: u64 = 86_400;

/// Step name used for the mail-sync tool
pub const MAILSYNC_STEP: &str = "mailsync";

/// Modes accepted by the extraction tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractMode {
    Transcripts,
    Gpa,
    Enrollment,
    Comments,
    Parents,
    Attendance,
}

impl ExtractMode {
    pub const ALL: [ExtractMode; 6] = [
        ExtractMode::Transcripts,
        ExtractMode::Gpa,
        ExtractMode::Enrollment,
        ExtractMode::Comments,
        ExtractMode::Parents,
        ExtractMode::Attendance,
    ];

    /// Argument passed verbatim to the extractor
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractMode::Transcripts => "transcripts",
            ExtractMode::Gpa => "gpa",
            ExtractMode::Enrollment => "enrollment",
            ExtractMode::Comments => "comments",
            ExtractMode::Parents => "parents",
            ExtractMode::Attendance => "attendance",
        }
    }
}

impl fmt::Display for ExtractMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtractMode {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExtractMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| DefinitionError::UnknownMode(s.to_string()))
    }
}

/// An external tool invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Extractor(ExtractMode),
    MailSync,
}

impl Tool {
    /// Default step name for this invocation
    pub fn step_name(&self) -> &'static str {
        match self {
            Tool::Extractor(mode) => mode.as_str(),
            Tool::MailSync => MAILSYNC_STEP,
        }
    }

    pub fn to_step(&self, name: impl Into<String>, paths: &ToolPaths) -> Step {
        match self {
            Tool::Extractor(mode) => Step::new(
                name,
                paths.extractor.clone(),
                vec![mode.as_str().to_string()],
            ),
            Tool::MailSync => Step::new(name, paths.mailsync.clone(), Vec::new()),
        }
    }
}

/// A built-in job
#[derive(Debug, Clone, Copy)]
pub struct JobSpec {
    pub name: &'static str,
    pub tools: &'static [Tool],
}

impl JobSpec {
    pub fn build(&self, paths: &ToolPaths) -> Job {
        let steps = self
            .tools
            .iter()
            .map(|tool| tool.to_step(tool.step_name(), paths))
            .collect();
        Job::new(self.name, steps)
    }
}

/// Jobs every deployment schedules
pub const BUILTIN_JOBS: &[JobSpec] = &[
    JobSpec {
        name: "run_attendance",
        tools: &[Tool::Extractor(ExtractMode::Attendance)],
    },
    JobSpec {
        name: "run_transcripts",
        tools: &[
            Tool::Extractor(ExtractMode::Transcripts),
            Tool::Extractor(ExtractMode::Gpa),
            Tool::Extractor(ExtractMode::Comments),
        ],
    },
    JobSpec {
        name: "run_mailsync",
        tools: &[Tool::Extractor(ExtractMode::Parents), Tool::MailSync],
    },
];

/// Errors in a job declared in the config file
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DefinitionError {
    #[error("Job '{0}' must have at least one step")]
    NoSteps(String),

    #[error("Step {index} of job '{job}' uses the extractor without a mode")]
    MissingMode { job: String, index: usize },

    #[error("Step {index} of job '{job}' gives a mode to the mail-sync tool, which takes none")]
    UnexpectedMode { job: String, index: usize },

    #[error("Job '{job}' has more than one step named '{step}'")]
    DuplicateStep { job: String, step: String },

    #[error("Unknown extractor mode: {0}")]
    UnknownMode(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Which tool a declared step invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Extractor,
    Mailsync,
}

/// A job declared in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,

    /// Recurrence (defaults to once per day)
    #[serde(default)]
    pub interval_seconds: Option<u64>,

    pub steps: Vec<StepDefinition>,
}

/// A step declared in the config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub tool: ToolKind,

    /// Extractor mode (required for the extractor, forbidden for mail-sync)
    #[serde(default)]
    pub mode: Option<ExtractMode>,

    /// Step name override (defaults to the mode, or "mailsync")
    #[serde(default)]
    pub name: Option<String>,
}

impl JobDefinition {
    /// Validate the definition and build its job
    pub fn build(&self, paths: &ToolPaths) -> Result<Job, DefinitionError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::EmptyName.into());
        }
        if self.steps.is_empty() {
            return Err(DefinitionError::NoSteps(self.name.clone()));
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(self.steps.len());

        for (index, def) in self.steps.iter().enumerate() {
            let tool = match (def.tool, def.mode) {
                (ToolKind::Extractor, Some(mode)) => Tool::Extractor(mode),
                (ToolKind::Extractor, None) => {
                    return Err(DefinitionError::MissingMode {
                        job: self.name.clone(),
                        index,
                    });
                }
                (ToolKind::Mailsync, None) => Tool::MailSync,
                (ToolKind::Mailsync, Some(_)) => {
                    return Err(DefinitionError::UnexpectedMode {
                        job: self.name.clone(),
                        index,
                    });
                }
            };

            let name = def
                .name
                .clone()
                .unwrap_or_else(|| tool.step_name().to_string());
            if !seen.insert(name.clone()) {
                return Err(DefinitionError::DuplicateStep {
                    job: self.name.clone(),
                    step: name,
                });
            }

            steps.push(tool.to_step(name, paths));
        }

        Ok(Job::new(self.name.clone(), steps))
    }

    pub fn interval(&self) -> u64 {
        self.interval_seconds.unwrap_or(DEFAULT_INTERVAL_SECONDS)
    }
}

/// Build the registry for a deployment: built-in jobs first, then any jobs
/// declared in the config file.
pub fn build_registry(config: &Config) -> Result<ScheduleRegistry, DefinitionError> {
    let mut registry = ScheduleRegistry::new();

    for spec in BUILTIN_JOBS {
        registry.register(spec.name, spec.build(&config.tools), config.interval_for(spec.name))?;
    }

    for def in &config.jobs {
        let job = def.build(&config.tools)?;
        let interval = config
            .schedule
            .get(&def.name)
            .copied()
            .unwrap_or_else(|| def.interval());
        registry.register(def.name.clone(), job, interval)?;
    }

    Ok(registry)
}
