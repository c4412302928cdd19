//! # In-Progress Set
//!
//! Task ids currently claimed by a worker, with the claiming worker recorded so
//! the orchestrator can drop every claim of a worker that has exited.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

use crate::models::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub worker_id: usize,
    pub claimed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InProgressSet {
    claims: DashMap<TaskId, Claim>,
}

impl InProgressSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `task_id` for `worker_id`.
    ///
    /// Returns `false` if a different worker already holds the claim. Re-claiming
    /// a task the same worker already holds succeeds.
    pub fn claim(&self, task_id: &TaskId, worker_id: usize) -> bool {
        match self.claims.entry(task_id.clone()) {
            Entry::Occupied(existing) => existing.get().worker_id == worker_id,
            Entry::Vacant(slot) => {
                slot.insert(Claim {
                    worker_id,
                    claimed_at: Utc::now(),
                });
                true
            }
        }
    }

    /// Idempotent
    pub fn release(&self, task_id: &TaskId) {
        self.claims.remove(task_id);
    }

    /// Drop every claim held by `worker_id`, returning the released ids
    pub fn release_owned_by(&self, worker_id: usize) -> Vec<TaskId> {
        let owned: Vec<TaskId> = self
            .claims
            .iter()
            .filter(|entry| entry.value().worker_id == worker_id)
            .map(|entry| entry.key().clone())
            .collect();

        owned
            .into_iter()
            .filter(|task_id| {
                self.claims
                    .remove_if(task_id, |_, claim| claim.worker_id == worker_id)
                    .is_some()
            })
            .collect()
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.claims.contains_key(task_id)
    }

    pub fn claim_of(&self, task_id: &TaskId) -> Option<Claim> {
        self.claims.get(task_id).map(|entry| *entry.value())
    }

    pub fn snapshot(&self) -> HashSet<TaskId> {
        self.claims.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
