//! Cadence configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::Priority;
use crate::scheduler::SchedulerConfig;

/// Main Cadence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scheduler loop settings
    pub scheduler: SchedulerConfig,

    /// Logging settings
    pub log: LogConfig,

    /// Shell-command tasks for `cadence run`
    pub tasks: Vec<TaskSpec>,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Duplicate task names are allowed; they are removed together.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.poll_interval_ms == 0 {
            return Err(eyre!("scheduler.poll-interval-ms must be greater than zero"));
        }
        for (index, task) in self.tasks.iter().enumerate() {
            if task.name.trim().is_empty() {
                return Err(eyre!("Task #{} has an empty name", index + 1));
            }
            if task.command.trim().is_empty() {
                return Err(eyre!("Task '{}' has an empty command", task.name));
            }
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .cadence.yml
        let local_config = PathBuf::from(".cadence.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/cadence/cadence.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cadence").join("cadence.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        Ok(config)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Write logs to this file instead of stderr
    pub file: Option<PathBuf>,
}

/// A recurring shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub name: String,

    #[serde(default)]
    pub priority: Priority,

    /// Minimum spacing between runs in milliseconds
    #[serde(rename = "interval-ms")]
    pub interval_ms: u64,

    /// Command line passed to `sh -c`
    pub command: String,
}

impl TaskSpec {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}
