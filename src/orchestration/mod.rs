//! # Orchestration
//!
//! The components that drive a sweep to completion.
//!
//! ## Key Components
//!
//! - [`WorkQueue`] - pending task ids, deduplicated, with timed dequeue
//! - [`InProgressSet`] - exclusive per-task claims
//! - [`ResultStore`] - keyed, append-only committed results
//! - [`worker`] - the claim → execute → validate → commit loop
//! - [`TimeoutEstimator`] - per-worker adaptive attempt bound
//! - [`Watchdog`] - periodic reconciliation of lost tasks
//! - [`Checkpointer`] - progress file, milestone snapshots, final export
//! - [`Orchestrator`] - top-level driver
//!
//! Shared state is passed explicitly through [`SweepContext`]; there are no
//! global singletons, so several runs can coexist in one process.

pub mod checkpointer;
pub mod context;
pub mod in_progress;
pub mod orchestrator;
pub mod progress;
pub mod result_store;
pub mod shutdown;
pub mod summary;
pub mod timeout_estimator;
pub mod watchdog;
pub mod work_queue;
pub mod worker;

pub use checkpointer::Checkpointer;
pub use context::SweepContext;
pub use in_progress::{Claim, InProgressSet};
pub use orchestrator::Orchestrator;
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use result_store::{CommitOutcome, ResultStore};
pub use shutdown::ShutdownSignal;
pub use summary::{MetricStats, RunOutcome, RunSummary};
pub use timeout_estimator::{DurationWindow, TimeoutEstimator};
pub use watchdog::{ReconcileReport, Watchdog};
pub use work_queue::WorkQueue;
pub use worker::{run_worker, Worker, WorkerExit, WorkerReport, WorkerState};
