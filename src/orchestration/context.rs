use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::{InProgressSet, ResultStore, ShutdownSignal, WorkQueue};
use crate::config::SweepConfig;
use crate::models::TaskId;

/// Handles to the shared run state, cloned into every worker and background loop
#[derive(Debug, Clone)]
pub struct SweepContext {
    pub config: Arc<SweepConfig>,
    /// The full work set, fixed for the life of the run
    pub catalog: Arc<BTreeSet<TaskId>>,
    pub queue: Arc<WorkQueue>,
    pub in_progress: Arc<InProgressSet>,
    pub results: Arc<ResultStore>,
    pub shutdown: ShutdownSignal,
}

impl SweepContext {
    pub fn new<I>(config: SweepConfig, catalog: I, results: ResultStore) -> Self
    where
        I: IntoIterator<Item = TaskId>,
    {
        Self {
            config: Arc::new(config),
            catalog: Arc::new(catalog.into_iter().collect()),
            queue: Arc::new(WorkQueue::new()),
            in_progress: Arc::new(InProgressSet::new()),
            results: Arc::new(results),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.catalog.len()
    }

    /// Completed tasks that belong to this run's catalog
    pub fn completed_tasks(&self) -> usize {
        self.results
            .completed_ids()
            .iter()
            .filter(|id| self.catalog.contains(*id))
            .count()
    }

    /// `all − completed − in_progress`, in catalog order
    pub fn missing_tasks(&self) -> Vec<TaskId> {
        let completed = self.results.completed_ids();
        let claimed = self.in_progress.snapshot();
        self.catalog
            .iter()
            .filter(|id| !completed.contains(*id) && !claimed.contains(*id))
            .cloned()
            .collect()
    }

    /// Catalog entries without a committed result, in catalog order
    pub fn uncompleted_tasks(&self) -> Vec<TaskId> {
        let completed: HashSet<TaskId> = self.results.completed_ids();
        self.catalog
            .iter()
            .filter(|id| !completed.contains(*id))
            .cloned()
            .collect()
    }

    pub fn is_finished(&self) -> bool {
        self.completed_tasks() == self.total_tasks()
    }
}
