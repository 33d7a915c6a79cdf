//! Schedule registry: which jobs exist and how often they recur.
//!
//! Pure bookkeeping. Entries are registered once at startup and read by
//! whatever drives the schedule; no execution happens here.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::job::Job;

/// Longest accepted recurrence (one year)
pub const MAX_INTERVAL_SECONDS: u64 = 365 * 24 * 60 * 60;

/// A job name and its recurrence interval
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub job_name: String,
    pub interval_seconds: u64,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Job name cannot be empty")]
    EmptyName,

    #[error("Job already registered: {0}")]
    DuplicateName(String),

    #[error("Interval for job '{name}' must be positive, got {interval_seconds}")]
    InvalidInterval { name: String, interval_seconds: u64 },

    #[error("Interval for job '{name}' is {interval_seconds}s, longer than the {max}s maximum")]
    IntervalTooLong {
        name: String,
        interval_seconds: u64,
        max: u64,
    },

    #[error("Unknown job: {0}")]
    UnknownJob(String),
}

#[derive(Debug)]
struct Registration {
    entry: ScheduleEntry,
    job: Arc<Job>,
}

/// Registered jobs in registration order
#[derive(Debug, Default)]
pub struct ScheduleRegistry {
    registrations: Vec<Registration>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `job` under `name`, recurring every `interval_seconds`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        job: Job,
        interval_seconds: u64,
    ) -> Result<(), RegistryError> {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if interval_seconds == 0 {
            return Err(RegistryError::InvalidInterval {
                name,
                interval_seconds,
            });
        }
        if interval_seconds > MAX_INTERVAL_SECONDS {
            return Err(RegistryError::IntervalTooLong {
                name,
                interval_seconds,
                max: MAX_INTERVAL_SECONDS,
            });
        }
        if self.contains(&name) {
            return Err(RegistryError::DuplicateName(name));
        }

        self.registrations.push(Registration {
            entry: ScheduleEntry {
                job_name: name,
                interval_seconds,
            },
            job: Arc::new(job),
        });
        Ok(())
    }

    /// Every schedule entry, in registration order
    pub fn list(&self) -> Vec<ScheduleEntry> {
        self.registrations.iter().map(|r| r.entry.clone()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registrations.iter().any(|r| r.entry.job_name == name)
    }

    /// Look up the job registered under `name`
    pub fn job(&self, name: &str) -> Result<Arc<Job>, RegistryError> {
        self.registrations
            .iter()
            .find(|r| r.entry.job_name == name)
            .map(|r| Arc::clone(&r.job))
            .ok_or_else(|| RegistryError::UnknownJob(name.to_string()))
    }

    /// Entries paired with their jobs, in registration order
    pub fn iter(&self) -> impl Iterator<Item = (&ScheduleEntry, &Arc<Job>)> {
        self.registrations.iter().map(|r| (&r.entry, &r.job))
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
