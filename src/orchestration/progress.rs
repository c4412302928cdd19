//! Throughput and ETA derived from elapsed time and completion count.

use std::time::Duration;
use tokio::time::Instant;

use crate::models::run_state::completion_percentage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
    /// Completions per minute during this process's lifetime
    pub rate_per_minute: f64,
    /// `None` until at least one task has completed in this process
    pub eta: Option<Duration>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    started: Instant,
    /// Results restored from a previous run, excluded from the rate
    baseline: usize,
}

impl ProgressTracker {
    pub fn new(baseline: usize) -> Self {
        Self {
            started: Instant::now(),
            baseline,
        }
    }

    pub fn snapshot(&self, completed: usize, total: usize) -> ProgressSnapshot {
        Self::compute(self.started.elapsed(), completed, total, self.baseline)
    }

    fn compute(elapsed: Duration, completed: usize, total: usize, baseline: usize) -> ProgressSnapshot {
        let done_here = completed.saturating_sub(baseline);
        let minutes = elapsed.as_secs_f64() / 60.0;
        let rate_per_minute = if minutes > 0.0 {
            done_here as f64 / minutes
        } else {
            0.0
        };

        let remaining = total.saturating_sub(completed);
        let eta = if remaining == 0 {
            Some(Duration::ZERO)
        } else if rate_per_minute > 0.0 {
            Some(Duration::from_secs_f64(remaining as f64 / rate_per_minute * 60.0))
        } else {
            None
        };

        ProgressSnapshot {
            completed,
            total,
            percent: completion_percentage(completed, total),
            rate_per_minute,
            eta,
            elapsed,
        }
    }
}

/// `1h 05m`, `12m 30s` or `45s`
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
