//! # Result Store
//!
//! Append-only, keyed collection of committed results. The first commit for a
//! task id wins; later commits for the same id are reported back as
//! [`CommitOutcome::AlreadyCompleted`] and discarded. When a journal is
//! attached every accepted commit is also appended to it.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use crate::models::{BacktestResult, TaskId};
use crate::persistence::ResultJournal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    AlreadyCompleted,
}

#[derive(Debug, Default)]
pub struct ResultStore {
    results: RwLock<BTreeMap<TaskId, BacktestResult>>,
    journal: Option<ResultJournal>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_journal(journal: ResultJournal) -> Self {
        Self {
            results: RwLock::new(BTreeMap::new()),
            journal: Some(journal),
        }
    }

    pub fn commit(&self, result: BacktestResult) -> CommitOutcome {
        let journal_copy = {
            let mut results = self.results.write();
            if results.contains_key(&result.task_id) {
                return CommitOutcome::AlreadyCompleted;
            }
            let copy = self.journal.as_ref().map(|_| result.clone());
            results.insert(result.task_id.clone(), result);
            copy
        };

        // Journal I/O happens outside the lock
        if let (Some(journal), Some(result)) = (&self.journal, journal_copy) {
            if let Err(e) = journal.append(&result) {
                warn!(
                    task_id = %result.task_id,
                    error = %e,
                    "📒 RESULT_STORE: Journal append failed, result kept in memory"
                );
            }
        }

        CommitOutcome::Committed
    }

    /// Load results from an earlier run without journaling them again.
    /// Returns how many were new.
    pub fn restore<I>(&self, previous: I) -> usize
    where
        I: IntoIterator<Item = BacktestResult>,
    {
        let mut results = self.results.write();
        let mut restored = 0;
        for result in previous {
            if !results.contains_key(&result.task_id) {
                results.insert(result.task_id.clone(), result);
                restored += 1;
            }
        }
        restored
    }

    pub fn is_completed(&self, task_id: &TaskId) -> bool {
        self.results.read().contains_key(task_id)
    }

    pub fn get(&self, task_id: &TaskId) -> Option<BacktestResult> {
        self.results.read().get(task_id).cloned()
    }

    pub fn completed_ids(&self) -> HashSet<TaskId> {
        self.results.read().keys().cloned().collect()
    }

    /// All results ordered by task id
    pub fn sorted_results(&self) -> Vec<BacktestResult> {
        self.results.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}
