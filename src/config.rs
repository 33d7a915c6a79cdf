//! Configuration for bbflow.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (EXTRACTOR_PATH, MAILSYNC_PATH, BBFLOW_HOME)
//! 2. Config file (`--config <path>`, else .bbflow/config.yaml found in the
//!    current directory or a parent)
//! 3. Defaults (tools next to the bbflow executable, home at ~/.bbflow)
//!
//! Relative paths in a config file resolve against the directory that
//! contains `.bbflow/` (or the file's own directory for an explicit path
//! elsewhere). The resolved `Config` is built once at startup and passed
//! by reference; nothing here is global.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::core::catalog::{JobDefinition, DEFAULT_INTERVAL_SECONDS};

pub const ENV_EXTRACTOR_PATH: &str = "EXTRACTOR_PATH";
pub const ENV_MAILSYNC_PATH: &str = "MAILSYNC_PATH";
pub const ENV_HOME: &str = "BBFLOW_HOME";

const CONFIG_DIR: &str = ".bbflow";
const CONFIG_FILE: &str = "config.yaml";
const DEFAULT_EXTRACTOR: &str = "bbextract";
const DEFAULT_MAILSYNC: &str = "mailsync";
const DEFAULT_STEP_TIMEOUT_SECONDS: u64 = 3600;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    /// Interval overrides by job name
    #[serde(default)]
    pub schedule: HashMap<String, u64>,
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Jobs beyond the built-in ones
    #[serde(default)]
    pub jobs: Vec<JobDefinition>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Extraction tool executable
    pub extractor: Option<String>,
    /// Mail-sync tool executable
    pub mailsync: Option<String>,
    /// State directory (run history)
    pub home: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionConfig {
    /// Kill steps running longer than this; `null` disables the limit, 0 is rejected
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: Option<u64>,
    /// Run every job once at startup instead of waiting one interval
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_step_timeout() -> Option<u64> {
    Some(DEFAULT_STEP_TIMEOUT_SECONDS)
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            step_timeout_seconds: default_step_timeout(),
            run_on_start: false,
        }
    }
}

/// Locations of the external tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub extractor: PathBuf,
    pub mailsync: PathBuf,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    pub tools: ToolPaths,
    /// State directory; run history lives in `<home>/runs`
    pub home: PathBuf,
    /// Interval overrides by job name
    pub schedule: HashMap<String, u64>,
    pub step_timeout: Option<Duration>,
    pub run_on_start: bool,
    pub jobs: Vec<JobDefinition>,
    /// Path to config file (if one was used)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_file(),
        };

        let file = match config_path {
            Some(path) => {
                let parsed = load_config_file(&path)?;
                Some((path, parsed))
            }
            None => None,
        };

        let exe_dir = std::env::current_exe()
            .context("Failed to determine bbflow executable location")?
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(CONFIG_DIR);

        Self::resolve(
            file,
            |key| std::env::var(key).ok(),
            &exe_dir,
            default_home,
        )
    }

    /// Merge a parsed config file, environment lookups and defaults.
    ///
    /// A zero `step_timeout_seconds` is rejected; use `null` to disable
    /// the limit.
    pub fn resolve<F>(
        file: Option<(PathBuf, ConfigFile)>,
        env: F,
        exe_dir: &Path,
        default_home: PathBuf,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (config_file, parsed) = match file {
            Some((path, parsed)) => (Some(path), parsed),
            None => (None, ConfigFile::default()),
        };
        let base_dir = config_file.as_deref().map(config_base_dir);

        if parsed.execution.step_timeout_seconds == Some(0) {
            bail!("execution.step_timeout_seconds must be positive (use null for no limit)");
        }

        let from_file = |value: &Option<String>| -> Option<PathBuf> {
            let value = value.as_deref()?;
            Some(match base_dir {
                Some(ref base) => resolve_path(base, value),
                None => PathBuf::from(value),
            })
        };

        let extractor = env(ENV_EXTRACTOR_PATH)
            .map(PathBuf::from)
            .or_else(|| from_file(&parsed.paths.extractor))
            .unwrap_or_else(|| exe_dir.join(DEFAULT_EXTRACTOR));

        let mailsync = env(ENV_MAILSYNC_PATH)
            .map(PathBuf::from)
            .or_else(|| from_file(&parsed.paths.mailsync))
            .unwrap_or_else(|| exe_dir.join(DEFAULT_MAILSYNC));

        let home = env(ENV_HOME)
            .map(PathBuf::from)
            .or_else(|| from_file(&parsed.paths.home))
            .unwrap_or(default_home);

        Ok(Self {
            tools: ToolPaths {
                extractor,
                mailsync,
            },
            home,
            schedule: parsed.schedule,
            step_timeout: parsed
                .execution
                .step_timeout_seconds
                .map(Duration::from_secs),
            run_on_start: parsed.execution.run_on_start,
            jobs: parsed.jobs,
            config_file,
        })
    }

    /// Directory holding one subdirectory per recorded run
    pub fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }

    /// Recurrence for a job, honoring schedule overrides
    pub fn interval_for(&self, job_name: &str) -> u64 {
        self.schedule
            .get(job_name)
            .copied()
            .unwrap_or(DEFAULT_INTERVAL_SECONDS)
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Directory relative paths in a config file are resolved against
fn config_base_dir(config_path: &Path) -> PathBuf {
    let parent = config_path.parent().unwrap_or(Path::new("."));
    if parent.file_name().is_some_and(|name| name == CONFIG_DIR) {
        parent.parent().unwrap_or(Path::new(".")).to_path_buf()
    } else {
        parent.to_path_buf()
    }
}

/// Resolve a path that may be relative to the config file's base directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(&path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let config = Config::resolve(
            None,
            no_env,
            Path::new("/srv/bbflow"),
            PathBuf::from("/home/ops/.bbflow"),
        )
        .unwrap();

        assert_eq!(config.tools.extractor, PathBuf::from("/srv/bbflow/bbextract"));
        assert_eq!(config.tools.mailsync, PathBuf::from("/srv/bbflow/mailsync"));
        assert_eq!(config.home, PathBuf::from("/home/ops/.bbflow"));
        assert_eq!(config.runs_dir(), PathBuf::from("/home/ops/.bbflow/runs"));
        assert_eq!(config.step_timeout, Some(Duration::from_secs(3600)));
        assert!(!config.run_on_start);
        assert!(config.config_file.is_none());
        assert_eq!(config.interval_for("run_attendance"), 86_400);
    }

    #[test]
    fn test_env_overrides_file() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
paths:
  extractor: /opt/from-file/bbextract
  mailsync: /opt/from-file/mailsync
"#,
        )
        .unwrap();

        let env = |key: &str| match key {
            ENV_EXTRACTOR_PATH => Some("/opt/from-env/bbextract".to_string()),
            _ => None,
        };

        let config = Config::resolve(
            Some((PathBuf::from("/etc/bbflow/config.yaml"), file)),
            env,
            Path::new("/srv/bbflow"),
            PathBuf::from("/home/ops/.bbflow"),
        )
        .unwrap();

        assert_eq!(config.tools.extractor, PathBuf::from("/opt/from-env/bbextract"));
        assert_eq!(config.tools.mailsync, PathBuf::from("/opt/from-file/mailsync"));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        let config_path = config_dir.join(CONFIG_FILE);
        std::fs::write(
            &config_path,
            r#"
version: "1.0"
paths:
  extractor: tools/bbextract
  home: state
schedule:
  run_transcripts: 3600
execution:
  step_timeout_seconds: null
  run_on_start: true
jobs:
  - name: run_enrollment
    steps:
      - tool: extractor
        mode: enrollment
"#,
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        assert_eq!(parsed.version.as_deref(), Some("1.0"));

        let config = Config::resolve(
            Some((config_path.clone(), parsed)),
            no_env,
            Path::new("/srv/bbflow"),
            PathBuf::from("/home/ops/.bbflow"),
        )
        .unwrap();

        // Relative paths resolve against the directory holding .bbflow/
        assert_eq!(config.tools.extractor, temp.path().join("tools/bbextract"));
        assert_eq!(config.home, temp.path().join("state"));
        assert_eq!(config.tools.mailsync, PathBuf::from("/srv/bbflow/mailsync"));
        assert_eq!(config.step_timeout, None);
        assert!(config.run_on_start);
        assert_eq!(config.interval_for("run_transcripts"), 3600);
        assert_eq!(config.interval_for("run_mailsync"), 86_400);
        assert_eq!(config.jobs.len(), 1);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_zero_step_timeout_is_rejected() {
        let file: ConfigFile =
            serde_yaml::from_str("execution:\n  step_timeout_seconds: 0\n").unwrap();

        let err = Config::resolve(
            Some((PathBuf::from("/etc/bbflow/config.yaml"), file)),
            no_env,
            Path::new("/srv/bbflow"),
            PathBuf::from("/home/ops/.bbflow"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("step_timeout_seconds"));
    }

    #[test]
    fn test_invalid_config_file_is_error() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.yaml");
        std::fs::write(&config_path, "schedule: [not, a, map]").unwrap();

        assert!(load_config_file(&config_path).is_err());
    }

    #[test]
    fn test_config_base_dir() {
        assert_eq!(
            config_base_dir(Path::new("/srv/app/.bbflow/config.yaml")),
            PathBuf::from("/srv/app")
        );
        assert_eq!(
            config_base_dir(Path::new("/etc/bbflow/config.yaml")),
            PathBuf::from("/etc/bbflow")
        );
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/./subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
