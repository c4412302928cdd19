use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

use super::{BacktestResult, TaskId};
use crate::config::SweepConfig;
use crate::error::{PersistenceError, PersistenceResult};

/// Checkpoint payload.
///
/// A point-in-time copy of the run. It is never consulted while the run is
/// live; the in-memory Result Store is authoritative until the process exits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub config: SweepConfig,
    pub all_tasks: Vec<TaskId>,
    /// Sorted by task id
    pub completed_results: Vec<BacktestResult>,
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub completion_percentage: f64,
    pub timestamp: DateTime<Utc>,
}

impl RunState {
    pub fn new(
        run_id: Uuid,
        config: SweepConfig,
        all_tasks: Vec<TaskId>,
        completed_results: Vec<BacktestResult>,
    ) -> Self {
        let total_tasks = all_tasks.len();
        let completed_tasks = completed_results.len();
        Self {
            run_id,
            config,
            all_tasks,
            completed_results,
            total_tasks,
            completed_tasks,
            completion_percentage: completion_percentage(completed_tasks, total_tasks),
            timestamp: Utc::now(),
        }
    }

    pub fn load(path: &Path) -> PersistenceResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| PersistenceError::serialization(path.display().to_string(), e))
    }

    pub fn to_pretty_json(&self) -> PersistenceResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Completed share of the work set in percent; an empty work set is complete
pub fn completion_percentage(completed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        completed as f64 / total as f64 * 100.0
    }
}
