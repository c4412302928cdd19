//! # Timeout Estimator
//!
//! Each worker bounds its next attempt by the mean of its most recent
//! successful durations plus a fixed buffer, falling back to a default until it
//! has history. The model is per worker; actuator sessions differ in speed.

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::WorkerConfig;
use crate::constants::defaults::ESTIMATOR_SAMPLE_SIZE;

/// Bounded history of successful attempt durations, oldest evicted first
#[derive(Debug, Clone)]
pub struct DurationWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl DurationWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Up to `n` samples, most recent last
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &Duration> {
        self.samples.iter().skip(self.samples.len().saturating_sub(n))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutEstimator {
    default_timeout: Duration,
    buffer: Duration,
    sample_size: usize,
}

impl TimeoutEstimator {
    pub fn new(default_timeout: Duration, buffer: Duration) -> Self {
        Self {
            default_timeout,
            buffer,
            sample_size: ESTIMATOR_SAMPLE_SIZE,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(config.default_task_timeout(), config.timeout_buffer())
    }

    /// `mean(last min(3, N)) + buffer`, or the default with no history
    pub fn estimate(&self, window: &DurationWindow) -> Duration {
        let recent: Vec<&Duration> = window.latest(self.sample_size).collect();
        if recent.is_empty() {
            return self.default_timeout;
        }
        let total: Duration = recent.iter().copied().sum();
        total / recent.len() as u32 + self.buffer
    }
}
