//! # System Constants
//!
//! Defaults and fixed names that define the operational boundaries of a sweep.
//! Every tunable here has a matching configuration field; the constants are the
//! values used when the configuration leaves a field unset.

/// Default timing and threshold values
pub mod defaults {
    pub const WORKER_COUNT: usize = 4;
    pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 300_000;
    pub const TIMEOUT_BUFFER_MS: u64 = 30_000;
    /// Number of most recent durations averaged by the timeout estimator
    pub const ESTIMATOR_SAMPLE_SIZE: usize = 3;
    pub const DURATION_WINDOW: usize = 10;
    pub const CONSECUTIVE_FAILURE_THRESHOLD: u32 = 3;
    pub const POLL_TIMEOUT_MS: u64 = 5_000;
    pub const STALE_RETRY_DELAY_MS: u64 = 5_000;
    pub const DUPLICATE_TOLERANCE: f64 = 0.0001;
    pub const INTER_TASK_DELAY_MS: u64 = 1_000;
    pub const STARTUP_JITTER_MIN_MS: u64 = 5_000;
    pub const STARTUP_JITTER_MAX_MS: u64 = 45_000;
    pub const WATCHDOG_INTERVAL_MS: u64 = 30_000;
    pub const CHECKPOINT_INTERVAL_MS: u64 = 60_000;
    pub const MILESTONE_PERCENT: u32 = 5;
    pub const PROGRESS_INTERVAL_MS: u64 = 10_000;
    pub const JOIN_TIMEOUT_MS: u64 = 30_000;
    pub const MAX_REPLACEMENT_WORKERS: usize = 4;
    /// Replacement workers spawned per batch when the pool has died
    pub const REPLACEMENT_BATCH: usize = 2;
    /// Offset added to replacement worker ids so they never collide with the originals
    pub const REPLACEMENT_ID_OFFSET: usize = 100;
    pub const START_TIME: &str = "10:00";
    pub const END_TIME: &str = "15:59";
    pub const INTERVAL_MINUTES: u32 = 1;
    pub const OUTPUT_DIRECTORY: &str = "runs";
    pub const RUN_NAME: &str = "sweep";
}

/// Files and directories inside a run directory
pub mod files {
    pub const PROGRESS_FILE: &str = "progress.json";
    pub const JOURNAL_FILE: &str = "checkpoint.jsonl";
    pub const BACKUP_DIR: &str = "backups";
    pub const RESULTS_CSV: &str = "results.csv";
    pub const CONFIG_FILE: &str = "sweep-config.yaml";
}

/// Column headers of the tabular export, in order
pub const CSV_HEADERS: [&str; 8] = [
    "Task ID",
    "CAGR",
    "Max Drawdown",
    "Win Percentage",
    "Capture Rate",
    "MAR",
    "Worker ID",
    "Completed At",
];

/// Number of missing task ids listed individually in the run summary
pub const SUMMARY_MISSING_PREVIEW: usize = 10;
