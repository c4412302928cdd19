pub mod mock_actuator;
pub mod strategies;

pub use mock_actuator::*;

use std::path::Path;
use sweep_core::config::SweepConfig;

/// Configuration with every interval shrunk so a sweep finishes in milliseconds
pub fn fast_config(output_directory: &Path, start: &str, end: &str) -> SweepConfig {
    let mut config = SweepConfig::default();
    config.catalog.start_time = start.to_string();
    config.catalog.end_time = end.to_string();
    config.catalog.interval_minutes = 1;

    config.workers.worker_count = 3;
    config.workers.default_task_timeout_ms = 2_000;
    config.workers.timeout_buffer_ms = 1_000;
    config.workers.poll_timeout_ms = 20;
    config.workers.stale_retry_delay_ms = 5;
    config.workers.inter_task_delay_ms = 0;
    config.workers.startup_jitter_min_ms = 0;
    config.workers.startup_jitter_max_ms = 0;

    config.watchdog.interval_ms = 20;
    config.checkpoint.interval_ms = 20;
    config.checkpoint.output_directory = output_directory.to_path_buf();
    config.checkpoint.run_name = "it".to_string();
    config.orchestrator.progress_interval_ms = 10;
    config.orchestrator.join_timeout_ms = 2_000;
    config
}
