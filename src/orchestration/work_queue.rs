//! # Work Queue
//!
//! FIFO of pending task ids shared by all workers. Enqueue never blocks and
//! never fails; a task id that is already pending is not queued a second time,
//! so the watchdog can re-enqueue everything it considers missing without
//! inflating the queue. Dequeue waits up to a caller-supplied timeout so workers
//! can observe shutdown between polls.

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::models::TaskId;

#[derive(Debug, Default)]
pub struct WorkQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<TaskId>,
    pending: HashSet<TaskId>,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the back. Returns `false` if the id was already pending.
    pub fn enqueue(&self, task_id: TaskId) -> bool {
        {
            let mut state = self.state.lock();
            if !state.pending.insert(task_id.clone()) {
                return false;
            }
            state.items.push_back(task_id);
        }
        self.available.notify_one();
        true
    }

    /// Pop the front without waiting
    pub fn try_dequeue(&self) -> Option<TaskId> {
        let mut state = self.state.lock();
        let task_id = state.items.pop_front()?;
        state.pending.remove(&task_id);
        Some(task_id)
    }

    /// Pop the front, waiting up to `timeout` for an item to arrive
    pub async fn dequeue(&self, timeout: Duration) -> Option<TaskId> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task_id) = self.try_dequeue() {
                return Some(task_id);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.try_dequeue();
            }
        }
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.state.lock().pending.contains(task_id)
    }

    /// Advisory only; may be stale by the time the caller acts on it
    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// Advisory only; may be stale by the time the caller acts on it
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }
}
