use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RawMetrics, TaskId};

/// A committed backtest result. Metrics are always on decimal scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub task_id: TaskId,
    pub metrics: RawMetrics,
    pub mar: f64,
    pub worker_id: usize,
    pub completed_at: DateTime<Utc>,
}

impl BacktestResult {
    /// Build a result from a raw reading, normalizing it and deriving MAR
    pub fn from_reading(task_id: TaskId, raw: RawMetrics, worker_id: usize) -> Self {
        Self::from_normalized(task_id, raw.normalized(), worker_id)
    }

    /// Build a result from metrics that are already on decimal scale
    pub fn from_normalized(task_id: TaskId, metrics: RawMetrics, worker_id: usize) -> Self {
        Self {
            task_id,
            mar: metrics.mar(),
            metrics,
            worker_id,
            completed_at: Utc::now(),
        }
    }
}
