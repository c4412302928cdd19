//! Simulated actuator.
//!
//! Stands in for a browser session so a full sweep can run in-process. Metrics
//! are a deterministic function of the task id and come back on percentage
//! scale, the way the real application displays them. Latency, transient
//! failures, stale readings and initialization failures are drawn from a
//! seeded RNG so runs are reproducible.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{ActuatorError, ActuatorFactory, ActuatorPort, ActuatorResult};
use crate::models::{RawMetrics, TaskId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationProfile {
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Probability that an attempt fails transiently
    pub failure_rate: f64,
    /// Probability that an attempt returns the previous task's metrics
    pub stale_rate: f64,
    /// Probability that `initialize` fails for a worker
    pub init_failure_rate: f64,
    pub seed: u64,
}

impl Default for SimulationProfile {
    fn default() -> Self {
        Self {
            min_latency_ms: 50,
            max_latency_ms: 250,
            failure_rate: 0.05,
            stale_rate: 0.05,
            init_failure_rate: 0.0,
            seed: 42,
        }
    }
}

/// Deterministic percentage-scale metrics for a task id
pub fn simulated_metrics(task_id: &TaskId) -> RawMetrics {
    let key = slot_key(task_id);
    RawMetrics::new(
        5.0 + (key % 37) as f64 * 0.75,
        -(8.0 + (key % 13) as f64),
        40.0 + (key % 29) as f64,
        2.0 + (key % 11) as f64 * 0.5,
    )
}

/// Minutes since midnight for `HH:MM` ids, an FNV-1a hash otherwise
fn slot_key(task_id: &TaskId) -> u64 {
    if let Some((hours, minutes)) = task_id.as_str().split_once(':') {
        if let (Ok(h), Ok(m)) = (hours.parse::<u64>(), minutes.parse::<u64>()) {
            return h * 60 + m;
        }
    }
    task_id
        .as_str()
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
        })
}

#[derive(Debug)]
pub struct SimulatedActuator {
    worker_id: usize,
    profile: SimulationProfile,
    rng: StdRng,
    displayed: Option<RawMetrics>,
    pending: Option<RawMetrics>,
}

impl SimulatedActuator {
    pub fn new(worker_id: usize, profile: SimulationProfile) -> Self {
        let rng = StdRng::seed_from_u64(profile.seed ^ (worker_id as u64).wrapping_mul(0x9e37_79b9));
        Self {
            worker_id,
            profile,
            rng,
            displayed: None,
            pending: None,
        }
    }

    fn latency(&mut self) -> Duration {
        let (min, max) = (self.profile.min_latency_ms, self.profile.max_latency_ms);
        if max <= min {
            Duration::from_millis(min)
        } else {
            Duration::from_millis(self.rng.gen_range(min..=max))
        }
    }
}

#[async_trait]
impl ActuatorPort for SimulatedActuator {
    async fn run_task(&mut self, task_id: &TaskId, timeout: Duration) -> ActuatorResult<RawMetrics> {
        let latency = self.latency();
        if latency > timeout {
            tokio::time::sleep(timeout).await;
            return Err(ActuatorError::timeout(task_id, timeout));
        }
        tokio::time::sleep(latency).await;

        if self.rng.gen_bool(self.profile.failure_rate.clamp(0.0, 1.0)) {
            return Err(ActuatorError::execution(task_id, "simulated page error"));
        }

        let fresh = simulated_metrics(task_id);
        if let Some(previous) = self.displayed {
            if self.rng.gen_bool(self.profile.stale_rate.clamp(0.0, 1.0)) {
                debug!(worker_id = self.worker_id, task_id = %task_id, "Simulating stale reading");
                self.pending = Some(fresh);
                return Ok(previous);
            }
        }

        self.displayed = Some(fresh);
        self.pending = None;
        Ok(fresh)
    }

    async fn read_metrics(&mut self) -> ActuatorResult<RawMetrics> {
        if let Some(fresh) = self.pending.take() {
            self.displayed = Some(fresh);
        }
        self.displayed
            .ok_or_else(|| ActuatorError::MetricsUnavailable("no backtest has run yet".to_string()))
    }

    async fn recover(&mut self) -> ActuatorResult<()> {
        debug!(worker_id = self.worker_id, "Simulated session revalidated");
        self.pending = None;
        Ok(())
    }

    async fn shutdown(&mut self) {
        debug!(worker_id = self.worker_id, "Simulated session closed");
    }
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedActuatorFactory {
    profile: SimulationProfile,
}

impl SimulatedActuatorFactory {
    pub fn new(profile: SimulationProfile) -> Self {
        Self { profile }
    }
}

#[async_trait]
impl ActuatorFactory for SimulatedActuatorFactory {
    type Actuator = SimulatedActuator;

    async fn initialize(&self, worker_id: usize) -> ActuatorResult<SimulatedActuator> {
        let mut actuator = SimulatedActuator::new(worker_id, self.profile.clone());
        if actuator
            .rng
            .gen_bool(self.profile.init_failure_rate.clamp(0.0, 1.0))
        {
            return Err(ActuatorError::Initialization {
                worker_id,
                reason: "simulated login failure".to_string(),
            });
        }
        Ok(actuator)
    }
}
