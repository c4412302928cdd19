//! # Sweep Configuration System
//!
//! YAML-based configuration with environment-specific overrides. Every section
//! has a `Default` implementation so an empty `sweep-config.yaml` is a complete,
//! valid configuration, and a file only needs to name the values it changes.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sweep_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration (environment auto-detected)
//! let manager = ConfigManager::load()?;
//!
//! let workers = manager.config().workers.worker_count;
//! let poll = manager.config().workers.poll_timeout();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::parse_time_of_day;
use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring sweep-config.yaml
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SweepConfig {
    /// Time-slot grid that defines the work set
    pub catalog: CatalogConfig,

    /// Worker pool sizing and per-attempt behaviour
    pub workers: WorkerConfig,

    /// Reconciliation loop settings
    pub watchdog: WatchdogConfig,

    /// Checkpoint, milestone snapshot and export settings
    pub checkpoint: CheckpointConfig,

    /// Top-level driver settings
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CatalogConfig {
    /// First slot, `HH:MM`
    pub start_time: String,
    /// Last slot (inclusive), `HH:MM`
    pub end_time: String,
    pub interval_minutes: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            start_time: defaults::START_TIME.to_string(),
            end_time: defaults::END_TIME.to_string(),
            interval_minutes: defaults::INTERVAL_MINUTES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    pub worker_count: usize,
    /// Attempt bound used before a worker has any recorded durations
    pub default_task_timeout_ms: u64,
    /// Added to the mean of recent durations
    pub timeout_buffer_ms: u64,
    /// Maximum number of durations each worker remembers
    pub duration_window: usize,
    pub consecutive_failure_threshold: u32,
    pub poll_timeout_ms: u64,
    pub stale_retry_delay_ms: u64,
    pub duplicate_tolerance: f64,
    pub inter_task_delay_ms: u64,
    pub startup_jitter_min_ms: u64,
    pub startup_jitter_max_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: defaults::WORKER_COUNT,
            default_task_timeout_ms: defaults::DEFAULT_TASK_TIMEOUT_MS,
            timeout_buffer_ms: defaults::TIMEOUT_BUFFER_MS,
            duration_window: defaults::DURATION_WINDOW,
            consecutive_failure_threshold: defaults::CONSECUTIVE_FAILURE_THRESHOLD,
            poll_timeout_ms: defaults::POLL_TIMEOUT_MS,
            stale_retry_delay_ms: defaults::STALE_RETRY_DELAY_MS,
            duplicate_tolerance: defaults::DUPLICATE_TOLERANCE,
            inter_task_delay_ms: defaults::INTER_TASK_DELAY_MS,
            startup_jitter_min_ms: defaults::STARTUP_JITTER_MIN_MS,
            startup_jitter_max_ms: defaults::STARTUP_JITTER_MAX_MS,
        }
    }
}

impl WorkerConfig {
    pub fn default_task_timeout(&self) -> Duration {
        Duration::from_millis(self.default_task_timeout_ms)
    }

    pub fn timeout_buffer(&self) -> Duration {
        Duration::from_millis(self.timeout_buffer_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn stale_retry_delay(&self) -> Duration {
        Duration::from_millis(self.stale_retry_delay_ms)
    }

    pub fn inter_task_delay(&self) -> Duration {
        Duration::from_millis(self.inter_task_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WatchdogConfig {
    pub interval_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::WATCHDOG_INTERVAL_MS,
        }
    }
}

impl WatchdogConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CheckpointConfig {
    pub interval_ms: u64,
    /// Snapshot granularity in whole percent of completion
    pub milestone_percent: u32,
    /// Parent directory under which run directories are created
    pub output_directory: PathBuf,
    pub run_name: String,
    /// Existing run directory whose journal seeds the completed set
    pub resume_from: Option<PathBuf>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::CHECKPOINT_INTERVAL_MS,
            milestone_percent: defaults::MILESTONE_PERCENT,
            output_directory: PathBuf::from(defaults::OUTPUT_DIRECTORY),
            run_name: defaults::RUN_NAME.to_string(),
            resume_from: None,
        }
    }
}

impl CheckpointConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub progress_interval_ms: u64,
    pub join_timeout_ms: u64,
    /// Total replacement workers allowed over the life of a run
    pub max_replacement_workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: defaults::PROGRESS_INTERVAL_MS,
            join_timeout_ms: defaults::JOIN_TIMEOUT_MS,
            max_replacement_workers: defaults::MAX_REPLACEMENT_WORKERS,
        }
    }
}

impl OrchestratorConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }
}

impl SweepConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (field, value) in [
            ("catalog.start_time", &self.catalog.start_time),
            ("catalog.end_time", &self.catalog.end_time),
        ] {
            if parse_time_of_day(value).is_err() {
                return Err(ConfigurationError::invalid_value(
                    field,
                    value.clone(),
                    "expected a 24-hour HH:MM time",
                ));
            }
        }

        if self.catalog.interval_minutes == 0 {
            return Err(ConfigurationError::invalid_value(
                "catalog.interval_minutes",
                "0",
                "interval must be greater than 0",
            ));
        }

        if self.workers.worker_count == 0 {
            return Err(ConfigurationError::invalid_value(
                "workers.worker_count",
                "0",
                "at least one worker is required",
            ));
        }

        if self.workers.duration_window == 0 {
            return Err(ConfigurationError::invalid_value(
                "workers.duration_window",
                "0",
                "duration window must hold at least one sample",
            ));
        }

        if self.workers.consecutive_failure_threshold == 0 {
            return Err(ConfigurationError::invalid_value(
                "workers.consecutive_failure_threshold",
                "0",
                "threshold must be greater than 0",
            ));
        }

        if !(self.workers.duplicate_tolerance >= 0.0 && self.workers.duplicate_tolerance.is_finite())
        {
            return Err(ConfigurationError::invalid_value(
                "workers.duplicate_tolerance",
                self.workers.duplicate_tolerance.to_string(),
                "tolerance must be a finite, non-negative number",
            ));
        }

        if self.workers.startup_jitter_min_ms > self.workers.startup_jitter_max_ms {
            return Err(ConfigurationError::invalid_value(
                "workers.startup_jitter_min_ms",
                self.workers.startup_jitter_min_ms.to_string(),
                format!(
                    "must not exceed startup_jitter_max_ms ({})",
                    self.workers.startup_jitter_max_ms
                ),
            ));
        }

        for (field, value) in [
            ("workers.default_task_timeout_ms", self.workers.default_task_timeout_ms),
            ("workers.poll_timeout_ms", self.workers.poll_timeout_ms),
            ("watchdog.interval_ms", self.watchdog.interval_ms),
            ("checkpoint.interval_ms", self.checkpoint.interval_ms),
            ("orchestrator.progress_interval_ms", self.orchestrator.progress_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigurationError::invalid_value(
                    field,
                    "0",
                    "interval must be greater than 0",
                ));
            }
        }

        if !(1..=100).contains(&self.checkpoint.milestone_percent) {
            return Err(ConfigurationError::invalid_value(
                "checkpoint.milestone_percent",
                self.checkpoint.milestone_percent.to_string(),
                "milestone must be between 1 and 100",
            ));
        }

        if self.checkpoint.run_name.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "checkpoint.run_name",
                "",
                "run name must not be empty",
            ));
        }

        Ok(())
    }
}
