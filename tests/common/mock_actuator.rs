use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use sweep_core::actuator::simulated::simulated_metrics;
use sweep_core::actuator::{ActuatorError, ActuatorFactory, ActuatorPort, ActuatorResult};
use sweep_core::models::{RawMetrics, TaskId};

/// Scripted behaviour shared by every actuator a [`MockActuatorFactory`] creates
#[derive(Debug, Default)]
pub struct MockScript {
    pub latency: Duration,
    /// Number of transient failures each task produces before succeeding
    pub failures_before_success: HashMap<TaskId, usize>,
    /// Tasks whose first successful run shows the previous task's metrics
    pub stale_once: HashSet<TaskId>,
    /// Workers whose runs always fail and whose recovery is rejected
    pub broken_workers: HashSet<usize>,
    /// When set, every worker behaves as broken
    pub all_broken: bool,
    pub init_failures: HashSet<usize>,
    pub fail_all_inits: bool,
}

#[derive(Debug, Default)]
pub struct MockLedger {
    pub runs: HashMap<TaskId, usize>,
    pub initialized: Vec<usize>,
    pub recoveries: usize,
    pub shutdowns: usize,
}

impl MockLedger {
    pub fn total_runs(&self) -> usize {
        self.runs.values().sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MockActuatorFactory {
    pub script: Arc<Mutex<MockScript>>,
    pub ledger: Arc<Mutex<MockLedger>>,
}

impl MockActuatorFactory {
    pub fn new(script: MockScript) -> Self {
        Self {
            script: Arc::new(Mutex::new(script)),
            ledger: Arc::new(Mutex::new(MockLedger::default())),
        }
    }

    pub fn runs_of(&self, task: &str) -> usize {
        self.ledger
            .lock()
            .runs
            .get(&TaskId::from(task))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ActuatorFactory for MockActuatorFactory {
    type Actuator = MockActuator;

    async fn initialize(&self, worker_id: usize) -> ActuatorResult<MockActuator> {
        let fails = {
            let script = self.script.lock();
            script.fail_all_inits || script.init_failures.contains(&worker_id)
        };
        if fails {
            return Err(ActuatorError::Initialization {
                worker_id,
                reason: "scripted init failure".to_string(),
            });
        }
        self.ledger.lock().initialized.push(worker_id);
        Ok(MockActuator {
            worker_id,
            script: Arc::clone(&self.script),
            ledger: Arc::clone(&self.ledger),
            displayed: None,
            pending: None,
        })
    }
}

pub struct MockActuator {
    worker_id: usize,
    script: Arc<Mutex<MockScript>>,
    ledger: Arc<Mutex<MockLedger>>,
    displayed: Option<RawMetrics>,
    pending: Option<RawMetrics>,
}

impl MockActuator {
    fn is_broken(&self) -> bool {
        let script = self.script.lock();
        script.all_broken || script.broken_workers.contains(&self.worker_id)
    }
}

#[async_trait]
impl ActuatorPort for MockActuator {
    async fn run_task(&mut self, task_id: &TaskId, _timeout: Duration) -> ActuatorResult<RawMetrics> {
        *self.ledger.lock().runs.entry(task_id.clone()).or_insert(0) += 1;

        let latency = self.script.lock().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        if self.is_broken() {
            return Err(ActuatorError::execution(task_id, "session broken"));
        }

        let (should_fail, stale) = {
            let mut script = self.script.lock();
            let should_fail = match script.failures_before_success.get_mut(task_id) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };
            let stale = !should_fail && script.stale_once.remove(task_id);
            (should_fail, stale)
        };

        if should_fail {
            return Err(ActuatorError::execution(task_id, "scripted failure"));
        }

        let fresh = simulated_metrics(task_id);
        if stale {
            if let Some(previous) = self.displayed {
                self.pending = Some(fresh);
                return Ok(previous);
            }
        }
        self.displayed = Some(fresh);
        Ok(fresh)
    }

    async fn read_metrics(&mut self) -> ActuatorResult<RawMetrics> {
        if let Some(fresh) = self.pending.take() {
            self.displayed = Some(fresh);
        }
        self.displayed
            .ok_or_else(|| ActuatorError::MetricsUnavailable("nothing displayed".to_string()))
    }

    async fn recover(&mut self) -> ActuatorResult<()> {
        self.ledger.lock().recoveries += 1;
        if self.is_broken() {
            Err(ActuatorError::RecoveryFailed("scripted".to_string()))
        } else {
            Ok(())
        }
    }

    async fn shutdown(&mut self) {
        self.ledger.lock().shutdowns += 1;
    }
}
