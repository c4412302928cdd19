//! # Orchestrator
//!
//! Top-level driver for one sweep. Builds the catalog, seeds the queue, starts
//! the watchdog, the checkpointer and the worker pool, then monitors until the
//! run completes, is interrupted, or runs out of workers. Whatever the ending,
//! it joins everything within a bounded time and writes the final export.

use futures::future::join_all;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::checkpointer::Checkpointer;
use super::progress::{format_duration, ProgressTracker};
use super::summary::{RunOutcome, RunSummary};
use super::watchdog::Watchdog;
use super::worker::{run_worker, WorkerExit, WorkerReport};
use super::{ResultStore, ShutdownSignal, SweepContext};
use crate::actuator::ActuatorFactory;
use crate::catalog::build_catalog;
use crate::config::{SweepConfig, WorkerConfig};
use crate::constants::defaults::{REPLACEMENT_BATCH, REPLACEMENT_ID_OFFSET};
use crate::error::{Result, SweepError};
use crate::logging::log_error;
use crate::models::BacktestResult;
use crate::persistence::{ResultJournal, RunDirectory};

struct WorkerHandle {
    worker_id: usize,
    handle: JoinHandle<WorkerReport>,
}

/// Pool bookkeeping owned by the monitor loop
#[derive(Debug, Default)]
struct PoolLedger {
    reports: Vec<WorkerReport>,
    any_initialized: bool,
    replacements_spawned: usize,
    next_replacement_id: usize,
}

pub struct Orchestrator<F: ActuatorFactory> {
    run_id: Uuid,
    config: SweepConfig,
    factory: Arc<F>,
    shutdown: ShutdownSignal,
}

impl<F: ActuatorFactory> Orchestrator<F> {
    pub fn new(config: SweepConfig, factory: F) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            run_id: Uuid::new_v4(),
            config,
            factory: Arc::new(factory),
            shutdown: ShutdownSignal::new(),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Handle for requesting shutdown from outside, e.g. on Ctrl-C
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub async fn run(self) -> Result<RunSummary> {
        let started = Instant::now();

        let catalog = build_catalog(&self.config.catalog)?;
        info!(
            total = catalog.len(),
            first = %catalog.first().map(ToString::to_string).unwrap_or_default(),
            last = %catalog.last().map(ToString::to_string).unwrap_or_default(),
            "🏗️ ORCHESTRATOR: Catalog built"
        );

        let (directory, previous) = self.prepare_run_directory()?;
        let results = match ResultJournal::open(&directory.journal_path()) {
            Ok(journal) => ResultStore::with_journal(journal),
            Err(e) => {
                log_error("orchestrator", "open_journal", &e.to_string(), None);
                ResultStore::new()
            }
        };

        let mut context = SweepContext::new(self.config.clone(), catalog, results);
        context.shutdown = self.shutdown.clone();

        let restored = context.results.restore(
            previous
                .into_iter()
                .filter(|result| context.catalog.contains(&result.task_id)),
        );
        if restored > 0 {
            info!(restored = restored, "♻️ ORCHESTRATOR: Resumed results from previous run");
        }

        for task_id in context.uncompleted_tasks() {
            context.queue.enqueue(task_id);
        }
        info!(
            queued = context.queue.len(),
            already_completed = restored,
            "📥 ORCHESTRATOR: Work queue seeded"
        );

        let checkpointer = Arc::new(Checkpointer::new(self.run_id, context.clone(), directory));
        let watchdog = Watchdog::new(context.clone());
        let background = vec![
            tokio::spawn(watchdog.clone().run()),
            tokio::spawn(Arc::clone(&checkpointer).run()),
        ];

        let mut workers: Vec<WorkerHandle> = (0..self.config.workers.worker_count)
            .map(|worker_id| {
                let delay = startup_delay(worker_id, &self.config.workers);
                self.spawn_worker(worker_id, delay, &context)
            })
            .collect();
        info!(
            workers = workers.len(),
            "🚀 ORCHESTRATOR: Worker pool started"
        );

        let mut ledger = PoolLedger {
            next_replacement_id: REPLACEMENT_ID_OFFSET,
            ..PoolLedger::default()
        };
        let monitored = self
            .monitor(&context, &watchdog, &mut workers, &mut ledger, restored)
            .await;

        self.shutdown.trigger();
        self.join_all_within_timeout(&context, workers, background, &mut ledger)
            .await;

        let export_path = match checkpointer.finalize() {
            Ok(path) => Some(path),
            Err(e) => {
                log_error("orchestrator", "final_export", &e.to_string(), None);
                None
            }
        };

        let outcome = monitored?;
        let results: Vec<BacktestResult> = context
            .results
            .sorted_results()
            .into_iter()
            .filter(|result| context.catalog.contains(&result.task_id))
            .collect();
        let summary = RunSummary::build(
            self.run_id,
            outcome,
            context.total_tasks(),
            &results,
            context.uncompleted_tasks(),
            started.elapsed(),
            checkpointer.directory().root().to_path_buf(),
            export_path,
        );

        info!(
            outcome = ?summary.outcome,
            completed = summary.completed,
            total = summary.total,
            missing = summary.missing.len(),
            elapsed = %format_duration(summary.elapsed),
            "🎉 ORCHESTRATOR: Run finished"
        );
        Ok(summary)
    }

    /// Resume into an existing directory (replaying its journal) or create a fresh one
    fn prepare_run_directory(&self) -> Result<(RunDirectory, Vec<BacktestResult>)> {
        let checkpoint = &self.config.checkpoint;
        match &checkpoint.resume_from {
            Some(path) => {
                let directory = RunDirectory::open_existing(path)?;
                let previous = ResultJournal::load(&directory.journal_path())?;
                info!(
                    directory = %directory.root().display(),
                    journaled = previous.len(),
                    "♻️ ORCHESTRATOR: Resuming run directory"
                );
                Ok((directory, previous))
            }
            None => Ok((
                RunDirectory::create(&checkpoint.output_directory, &checkpoint.run_name)?,
                Vec::new(),
            )),
        }
    }

    fn spawn_worker(&self, worker_id: usize, delay: Duration, context: &SweepContext) -> WorkerHandle {
        WorkerHandle {
            worker_id,
            handle: tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&self.factory),
                context.clone(),
                delay,
            )),
        }
    }

    async fn monitor(
        &self,
        context: &SweepContext,
        watchdog: &Watchdog,
        workers: &mut Vec<WorkerHandle>,
        ledger: &mut PoolLedger,
        restored: usize,
    ) -> Result<RunOutcome> {
        let tracker = ProgressTracker::new(restored);
        let interval = self.config.orchestrator.progress_interval();

        loop {
            if context.is_finished() {
                return Ok(RunOutcome::Completed);
            }
            if context.shutdown.is_triggered() {
                info!("🛑 ORCHESTRATOR: Shutdown requested");
                return Ok(RunOutcome::Interrupted);
            }

            Self::reap_finished(context, workers, ledger).await;

            if workers.is_empty() {
                if !ledger.any_initialized && ledger.replacements_spawned == 0 {
                    error!("💥 ORCHESTRATOR: No worker could initialize an actuator");
                    return Err(SweepError::NoWorkersAvailable(format!(
                        "all {} workers failed to initialize",
                        ledger.reports.len()
                    )));
                }

                let budget = self
                    .config
                    .orchestrator
                    .max_replacement_workers
                    .saturating_sub(ledger.replacements_spawned);
                if budget == 0 {
                    error!(
                        remaining = context.total_tasks() - context.completed_tasks(),
                        "💥 ORCHESTRATOR: All workers exited and replacement budget is spent"
                    );
                    return Ok(RunOutcome::Abandoned);
                }

                let batch = REPLACEMENT_BATCH
                    .min(self.config.workers.worker_count)
                    .min(budget);
                warn!(
                    batch = batch,
                    spawned_so_far = ledger.replacements_spawned,
                    "🔁 ORCHESTRATOR: All workers exited with work remaining, spawning replacements"
                );
                for index in 0..batch {
                    let worker_id = ledger.next_replacement_id;
                    ledger.next_replacement_id += 1;
                    ledger.replacements_spawned += 1;
                    let delay = startup_delay(index, &self.config.workers);
                    workers.push(self.spawn_worker(worker_id, delay, context));
                }
            }

            // Idle but unfinished means something was lost between the structures
            if context.queue.is_empty() && context.in_progress.is_empty() {
                watchdog.reconcile();
            }

            let snapshot = tracker.snapshot(context.completed_tasks(), context.total_tasks());
            info!(
                completed = snapshot.completed,
                total = snapshot.total,
                percent = %format!("{:.1}", snapshot.percent),
                rate_per_minute = %format!("{:.2}", snapshot.rate_per_minute),
                eta = %snapshot.eta.map(format_duration).unwrap_or_else(|| "unknown".to_string()),
                queued = context.queue.len(),
                in_progress = context.in_progress.len(),
                live_workers = workers.len(),
                "📊 ORCHESTRATOR: Progress"
            );

            if !context.shutdown.sleep(interval).await {
                return Ok(if context.is_finished() {
                    RunOutcome::Completed
                } else {
                    info!("🛑 ORCHESTRATOR: Shutdown requested");
                    RunOutcome::Interrupted
                });
            }
        }
    }

    /// Collect reports from finished workers and drop any claims they still hold
    async fn reap_finished(
        context: &SweepContext,
        workers: &mut Vec<WorkerHandle>,
        ledger: &mut PoolLedger,
    ) {
        let (finished, running): (Vec<_>, Vec<_>) =
            workers.drain(..).partition(|worker| worker.handle.is_finished());
        *workers = running;

        for worker in finished {
            Self::record_exit(context, worker.worker_id, worker.handle.await, ledger);
        }
    }

    fn record_exit(
        context: &SweepContext,
        worker_id: usize,
        joined: std::result::Result<WorkerReport, tokio::task::JoinError>,
        ledger: &mut PoolLedger,
    ) {
        let released = context.in_progress.release_owned_by(worker_id);
        if !released.is_empty() {
            warn!(
                worker_id = worker_id,
                released = released.len(),
                "🧹 ORCHESTRATOR: Released claims of exited worker"
            );
        }

        match joined {
            Ok(report) => {
                ledger.any_initialized |= report.initialized;
                match &report.exit {
                    WorkerExit::Shutdown => {
                        info!(worker_id = worker_id, completed = report.completed, "👷 ORCHESTRATOR: Worker stopped")
                    }
                    WorkerExit::InitializationFailed(e) | WorkerExit::RecoveryFailed(e) => {
                        error!(worker_id = worker_id, error = %e, "💀 ORCHESTRATOR: Worker exited fatally")
                    }
                }
                ledger.reports.push(report);
            }
            Err(e) => {
                error!(worker_id = worker_id, error = %e, "💀 ORCHESTRATOR: Worker task panicked");
            }
        }
    }

    async fn join_all_within_timeout(
        &self,
        context: &SweepContext,
        workers: Vec<WorkerHandle>,
        background: Vec<JoinHandle<()>>,
        ledger: &mut PoolLedger,
    ) {
        let timeout = self.config.orchestrator.join_timeout();
        let ids: Vec<usize> = workers.iter().map(|w| w.worker_id).collect();
        let joins = join_all(workers.into_iter().map(|w| w.handle));

        match tokio::time::timeout(timeout, async { (joins.await, join_all(background).await) }).await {
            Ok((joined, _)) => {
                for (worker_id, result) in ids.into_iter().zip(joined) {
                    Self::record_exit(context, worker_id, result, ledger);
                }
                info!("✅ ORCHESTRATOR: All workers joined");
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "⏱️ ORCHESTRATOR: Join timed out, detaching remaining workers"
                );
            }
        }
    }
}

/// Worker 0 starts immediately; the rest wait a random delay within the configured bounds
pub fn startup_delay(index: usize, config: &WorkerConfig) -> Duration {
    if index == 0 || config.startup_jitter_max_ms == 0 {
        return Duration::ZERO;
    }
    let min = config.startup_jitter_min_ms.min(config.startup_jitter_max_ms);
    Duration::from_millis(rand::thread_rng().gen_range(min..=config.startup_jitter_max_ms))
}
