//! # Actuator Port
//!
//! The boundary between the orchestration core and whatever actually runs a
//! backtest. Production actuators drive a browser session; the core only sees
//! this trait. Each worker owns exactly one actuator for its whole lifetime, so
//! implementations take `&mut self` and need no internal locking.

pub mod simulated;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::{RawMetrics, TaskId};

/// How the worker loop should react to an actuator error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The attempt failed; re-enqueue the task and keep going
    Transient,
    /// The session is unusable; recover before the next attempt or give up
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActuatorError {
    #[error("Actuator initialization failed for worker {worker_id}: {reason}")]
    Initialization { worker_id: usize, reason: String },
    #[error("Task {task_id} failed: {reason}")]
    Execution { task_id: TaskId, reason: String },
    #[error("Task {task_id} did not finish within {timeout_ms}ms")]
    Timeout { task_id: TaskId, timeout_ms: u64 },
    #[error("Metrics unavailable: {0}")]
    MetricsUnavailable(String),
    #[error("Session lost: {0}")]
    SessionLost(String),
    #[error("Recovery failed: {0}")]
    RecoveryFailed(String),
}

impl ActuatorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Execution { .. } | Self::Timeout { .. } | Self::MetricsUnavailable(_) => {
                ErrorKind::Transient
            }
            Self::Initialization { .. } | Self::SessionLost(_) | Self::RecoveryFailed(_) => {
                ErrorKind::Fatal
            }
        }
    }

    pub fn execution(task_id: &TaskId, reason: impl Into<String>) -> Self {
        Self::Execution {
            task_id: task_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn timeout(task_id: &TaskId, timeout: Duration) -> Self {
        Self::Timeout {
            task_id: task_id.clone(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

pub type ActuatorResult<T> = Result<T, ActuatorError>;

/// One actuator session, owned by a single worker
#[async_trait]
pub trait ActuatorPort: Send {
    /// Run one backtest and return its metrics. `timeout` is the worker's
    /// current estimate; the worker also enforces it externally.
    async fn run_task(&mut self, task_id: &TaskId, timeout: Duration) -> ActuatorResult<RawMetrics>;

    /// Re-read the metrics currently displayed without starting a new run
    async fn read_metrics(&mut self) -> ActuatorResult<RawMetrics>;

    /// Re-validate or re-establish the session after repeated failures
    async fn recover(&mut self) -> ActuatorResult<()>;

    /// Release the session. Called exactly once when the worker exits.
    async fn shutdown(&mut self);
}

/// Creates one actuator per worker
#[async_trait]
pub trait ActuatorFactory: Send + Sync + 'static {
    type Actuator: ActuatorPort + 'static;

    async fn initialize(&self, worker_id: usize) -> ActuatorResult<Self::Actuator>;
}
