//! # Worker
//!
//! One worker owns one actuator session and repeats a single attempt cycle:
//!
//! ```text
//! Idle → Claimed → Executing → Validating → Committing → Idle
//!                      │            │
//!                      └── Failed ──┴──→ release claim, re-enqueue → Idle
//! ```
//!
//! Transient failures never leave this loop. After too many consecutive
//! failures (or any fatal actuator error) the worker asks the actuator to
//! recover; if that fails the worker exits and its tasks are picked up again by
//! the watchdog.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::timeout_estimator::{DurationWindow, TimeoutEstimator};
use super::{CommitOutcome, SweepContext};
use crate::actuator::{ActuatorError, ActuatorFactory, ActuatorPort, ErrorKind};
use crate::config::WorkerConfig;
use crate::logging::{log_task_operation, log_worker_operation};
use crate::models::{BacktestResult, RawMetrics, TaskId};

/// Per-worker mutable state. Only the owning worker loop touches it.
#[derive(Debug, Clone)]
pub struct WorkerState {
    pub id: usize,
    pub consecutive_failures: u32,
    pub recent_durations: DurationWindow,
    /// Baseline for stale-reading detection
    pub last_result: Option<BacktestResult>,
    pub completed: usize,
    pub failed: usize,
    pub stale_rereads: usize,
}

impl WorkerState {
    pub fn new(id: usize, duration_window: usize) -> Self {
        Self {
            id,
            consecutive_failures: 0,
            recent_durations: DurationWindow::new(duration_window),
            last_result: None,
            completed: 0,
            failed: 0,
            stale_rereads: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkerExit {
    /// Shutdown was requested
    Shutdown,
    /// The actuator could not be initialized; no task was attempted
    InitializationFailed(ActuatorError),
    /// Recovery after repeated failures did not succeed
    RecoveryFailed(ActuatorError),
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub exit: WorkerExit,
    pub initialized: bool,
    pub completed: usize,
    pub failed: usize,
    pub stale_rereads: usize,
}

impl WorkerReport {
    fn without_session(worker_id: usize, exit: WorkerExit) -> Self {
        Self {
            worker_id,
            exit,
            initialized: false,
            completed: 0,
            failed: 0,
            stale_rereads: 0,
        }
    }
}

/// Result of handling one dequeued task id
#[derive(Debug, Clone, PartialEq)]
enum Attempt {
    /// Not attempted: already completed, not in the catalog, or claimed elsewhere
    Skipped,
    Committed(CommitOutcome),
    Failed(ErrorKind),
    /// Shutdown arrived mid-attempt; the task went back on the queue
    Interrupted,
}

/// Wait out the startup delay, initialize an actuator, and run the worker loop
pub async fn run_worker<F>(
    worker_id: usize,
    factory: Arc<F>,
    context: SweepContext,
    startup_delay: Duration,
) -> WorkerReport
where
    F: ActuatorFactory,
{
    if !startup_delay.is_zero() {
        debug!(
            worker_id = worker_id,
            delay_ms = startup_delay.as_millis() as u64,
            "👷 WORKER: Waiting before actuator initialization"
        );
        if !context.shutdown.sleep(startup_delay).await {
            return WorkerReport::without_session(worker_id, WorkerExit::Shutdown);
        }
    }

    let actuator = match factory.initialize(worker_id).await {
        Ok(actuator) => actuator,
        Err(e) => {
            warn!(worker_id = worker_id, error = %e, "👷 WORKER: Actuator initialization failed");
            log_worker_operation(worker_id, "initialize", "failed", Some(e.to_string().as_str()));
            return WorkerReport::without_session(worker_id, WorkerExit::InitializationFailed(e));
        }
    };

    log_worker_operation(worker_id, "initialize", "ready", None);
    Worker::new(worker_id, actuator, context).run().await
}

pub struct Worker<A: ActuatorPort> {
    state: WorkerState,
    actuator: A,
    context: SweepContext,
    estimator: TimeoutEstimator,
    config: WorkerConfig,
}

impl<A: ActuatorPort> Worker<A> {
    pub fn new(worker_id: usize, actuator: A, context: SweepContext) -> Self {
        let config = context.config.workers.clone();
        Self {
            state: WorkerState::new(worker_id, config.duration_window),
            actuator,
            estimator: TimeoutEstimator::from_config(&config),
            context,
            config,
        }
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    #[instrument(skip(self), fields(worker_id = self.state.id))]
    pub async fn run(mut self) -> WorkerReport {
        info!("👷 WORKER: Started");

        let exit = loop {
            if self.context.shutdown.is_triggered() {
                break WorkerExit::Shutdown;
            }

            let Some(task_id) = self.context.queue.dequeue(self.config.poll_timeout()).await else {
                continue;
            };

            if self.context.shutdown.is_triggered() {
                self.context.queue.enqueue(task_id);
                break WorkerExit::Shutdown;
            }

            match self.attempt(task_id).await {
                Attempt::Skipped => continue,
                Attempt::Interrupted => break WorkerExit::Shutdown,
                Attempt::Committed(_) => {}
                Attempt::Failed(kind) => {
                    if let Err(e) = self.after_failure(kind).await {
                        break WorkerExit::RecoveryFailed(e);
                    }
                }
            }

            self.context.shutdown.sleep(self.config.inter_task_delay()).await;
        };

        self.actuator.shutdown().await;

        info!(
            completed = self.state.completed,
            failed = self.state.failed,
            stale_rereads = self.state.stale_rereads,
            exit = ?exit,
            "👷 WORKER: Stopped"
        );

        WorkerReport {
            worker_id: self.state.id,
            exit,
            initialized: true,
            completed: self.state.completed,
            failed: self.state.failed,
            stale_rereads: self.state.stale_rereads,
        }
    }

    async fn attempt(&mut self, task_id: TaskId) -> Attempt {
        let worker_id = self.state.id;

        if !self.context.catalog.contains(&task_id) {
            warn!(task_id = %task_id, "👷 WORKER: Dropping task outside the catalog");
            return Attempt::Skipped;
        }
        if self.context.results.is_completed(&task_id) {
            debug!(task_id = %task_id, "👷 WORKER: Skipping already completed task");
            return Attempt::Skipped;
        }
        if !self.context.in_progress.claim(&task_id, worker_id) {
            debug!(task_id = %task_id, "👷 WORKER: Task claimed by another worker");
            return Attempt::Skipped;
        }

        let timeout = self.estimator.estimate(&self.state.recent_durations);
        log_task_operation(
            "execute",
            task_id.as_str(),
            Some(worker_id),
            "started",
            Some(format!("timeout_ms={}", timeout.as_millis()).as_str()),
        );

        let started = Instant::now();
        let outcome = tokio::time::timeout(timeout, self.actuator.run_task(&task_id, timeout)).await;
        let reading = match outcome {
            Ok(Ok(reading)) => reading,
            Ok(Err(e)) => return self.fail(task_id, e),
            Err(_) => return self.fail(task_id.clone(), ActuatorError::timeout(&task_id, timeout)),
        };
        let elapsed = started.elapsed();

        let metrics = match self.validate(&task_id, reading).await {
            Ok(Some(metrics)) => metrics,
            Ok(None) => {
                self.context.in_progress.release(&task_id);
                self.context.queue.enqueue(task_id);
                return Attempt::Interrupted;
            }
            Err(e) => return self.fail(task_id, e),
        };

        self.commit(task_id, metrics, elapsed)
    }

    /// Normalize and check the reading against the previous result.
    /// `Ok(None)` means shutdown arrived while waiting to re-read.
    async fn validate(
        &mut self,
        task_id: &TaskId,
        reading: RawMetrics,
    ) -> Result<Option<RawMetrics>, ActuatorError> {
        let mut metrics = reading.normalized();

        let is_stale = self
            .state
            .last_result
            .as_ref()
            .is_some_and(|last| metrics.within_tolerance(&last.metrics, self.config.duplicate_tolerance));

        if is_stale {
            self.state.stale_rereads += 1;
            warn!(
                task_id = %task_id,
                "👷 WORKER: Reading matches previous result, re-reading after delay"
            );
            if !self.context.shutdown.sleep(self.config.stale_retry_delay()).await {
                return Ok(None);
            }
            // The re-read is accepted as-is, even if it still matches
            metrics = self.actuator.read_metrics().await?.normalized();
        }

        if !metrics.is_finite() {
            return Err(ActuatorError::execution(task_id, "non-finite metrics"));
        }

        Ok(Some(metrics))
    }

    /// `metrics` come from `validate` and are already on decimal scale
    fn commit(&mut self, task_id: TaskId, metrics: RawMetrics, elapsed: Duration) -> Attempt {
        let result = BacktestResult::from_normalized(task_id.clone(), metrics, self.state.id);
        let outcome = self.context.results.commit(result.clone());

        match outcome {
            CommitOutcome::Committed => {
                self.state.completed += 1;
                info!(
                    task_id = %task_id,
                    cagr = result.metrics.cagr,
                    mar = result.mar,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "✅ WORKER: Result committed"
                );
            }
            CommitOutcome::AlreadyCompleted => {
                debug!(task_id = %task_id, "👷 WORKER: Duplicate result discarded");
            }
        }

        self.state.last_result = Some(result);
        self.state.consecutive_failures = 0;
        self.state.recent_durations.record(elapsed);
        self.context.in_progress.release(&task_id);

        Attempt::Committed(outcome)
    }

    fn fail(&mut self, task_id: TaskId, error: ActuatorError) -> Attempt {
        self.state.failed += 1;
        self.state.consecutive_failures += 1;

        warn!(
            task_id = %task_id,
            error = %error,
            consecutive_failures = self.state.consecutive_failures,
            "⚠️ WORKER: Attempt failed, task re-enqueued"
        );

        self.context.in_progress.release(&task_id);
        self.context.queue.enqueue(task_id);

        Attempt::Failed(error.kind())
    }

    async fn after_failure(&mut self, kind: ErrorKind) -> Result<(), ActuatorError> {
        let threshold_reached =
            self.state.consecutive_failures >= self.config.consecutive_failure_threshold;
        if kind != ErrorKind::Fatal && !threshold_reached {
            return Ok(());
        }

        warn!(
            consecutive_failures = self.state.consecutive_failures,
            kind = ?kind,
            "🔄 WORKER: Recovering actuator session"
        );

        match self.actuator.recover().await {
            Ok(()) => {
                self.state.consecutive_failures = 0;
                log_worker_operation(self.state.id, "recover", "recovered", None);
                Ok(())
            }
            Err(e) => {
                log_worker_operation(self.state.id, "recover", "failed", Some(e.to_string().as_str()));
                Err(e)
            }
        }
    }
}
