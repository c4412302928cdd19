//! # Watchdog
//!
//! Periodic reconciler restoring `queue ∪ in_progress ∪ completed = catalog`.
//! Tasks dropped by a dead worker, or lost between a release and a re-enqueue,
//! are put back on the queue. Re-enqueueing a task that is already pending is a
//! no-op in the queue, so reconciliation is safe to run at any time.

use tracing::{debug, info, instrument, warn};

use super::SweepContext;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub missing: usize,
    /// Missing tasks that were not already pending and got queued
    pub requeued: usize,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    context: SweepContext,
}

impl Watchdog {
    pub fn new(context: SweepContext) -> Self {
        Self { context }
    }

    /// One reconciliation pass: `missing = all − completed − in_progress`, re-enqueue each
    pub fn reconcile(&self) -> ReconcileReport {
        let missing = self.context.missing_tasks();
        let requeued = missing
            .iter()
            .filter(|task_id| self.context.queue.enqueue((*task_id).clone()))
            .count();

        if requeued > 0 {
            warn!(
                missing = missing.len(),
                requeued = requeued,
                first = %missing.first().map(ToString::to_string).unwrap_or_default(),
                "🐕 WATCHDOG: Re-queued tasks missing from queue and in-progress set"
            );
        } else {
            debug!(missing = missing.len(), "🐕 WATCHDOG: Reconciled, nothing lost");
        }

        ReconcileReport {
            missing: missing.len(),
            requeued,
        }
    }

    /// Reconcile every `watchdog.interval_ms` until shutdown
    #[instrument(skip(self))]
    pub async fn run(self) {
        let interval = self.context.config.watchdog.interval();
        info!(interval_ms = interval.as_millis() as u64, "🐕 WATCHDOG: Started");

        while self.context.shutdown.sleep(interval).await {
            self.reconcile();
        }

        info!("🐕 WATCHDOG: Stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepConfig;
    use crate::models::{BacktestResult, RawMetrics, TaskId};
    use crate::orchestration::ResultStore;
    use std::time::Duration;

    fn context() -> SweepContext {
        let catalog: Vec<TaskId> = ["10:00", "10:01", "10:02", "10:03", "10:04"]
            .into_iter()
            .map(TaskId::from)
            .collect();
        let mut config = SweepConfig::default();
        config.watchdog.interval_ms = 10;
        SweepContext::new(config, catalog, ResultStore::new())
    }

    #[test]
    fn test_reconcile_requeues_lost_tasks_only() {
        let ctx = context();
        ctx.results.commit(BacktestResult::from_reading(
            TaskId::from("10:00"),
            RawMetrics::new(0.1, -0.1, 0.5, 0.1),
            0,
        ));
        ctx.in_progress.claim(&TaskId::from("10:01"), 1);
        ctx.queue.enqueue(TaskId::from("10:02"));
        // 10:03 and 10:04 were dropped

        let report = Watchdog::new(ctx.clone()).reconcile();
        assert_eq!(report.missing, 3);
        assert_eq!(report.requeued, 2);
        assert_eq!(ctx.queue.len(), 3);
        assert!(ctx.queue.contains(&TaskId::from("10:03")));
        assert!(!ctx.queue.contains(&TaskId::from("10:01")));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let ctx = context();
        let watchdog = Watchdog::new(ctx.clone());
        assert_eq!(watchdog.reconcile().requeued, 5);
        assert_eq!(watchdog.reconcile().requeued, 0);
        assert_eq!(ctx.queue.len(), 5);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let ctx = context();
        let handle = tokio::spawn(Watchdog::new(ctx.clone()).run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ctx.queue.len(), 5);
        ctx.shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
