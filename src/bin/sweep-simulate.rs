//! # Sweep Simulator
//!
//! Runs a complete sweep against the in-process simulated actuator using the
//! regular configuration stack (`sweep-config.yaml`, environment sections and
//! `SWEEP_*` overrides). Useful for exercising checkpoints, resume and the
//! failure paths without a browser.
//!
//! Exit status: 0 when every task completed, 130 when interrupted, 2 when the
//! worker pool was exhausted, 1 on a run-fatal error.

use anyhow::Context;
use std::process::ExitCode;
use sweep_core::actuator::simulated::{SimulatedActuatorFactory, SimulationProfile};
use sweep_core::config::{ConfigManager, ConfigurationError, SweepConfig};
use sweep_core::logging::init_structured_logging;
use sweep_core::orchestration::{Orchestrator, RunOutcome};
use tracing::{error, info, warn};

fn load_config() -> anyhow::Result<SweepConfig> {
    match ConfigManager::load() {
        Ok(manager) => Ok(manager.config().clone()),
        Err(ConfigurationError::ConfigFileNotFound { searched_paths }) => {
            warn!(
                searched = ?searched_paths,
                "⚙️ CONFIG: No configuration file found, using defaults"
            );
            let manager = ConfigManager::from_config(SweepConfig::default())?;
            Ok(manager.config().clone())
        }
        Err(e) => Err(e).context("failed to load sweep configuration"),
    }
}

/// Simulation knobs come from `SWEEP_SIM_*` variables
fn simulation_profile() -> anyhow::Result<SimulationProfile> {
    let mut profile = SimulationProfile::default();
    if let Ok(raw) = std::env::var("SWEEP_SIM_FAILURE_RATE") {
        profile.failure_rate = raw.parse().context("SWEEP_SIM_FAILURE_RATE")?;
    }
    if let Ok(raw) = std::env::var("SWEEP_SIM_STALE_RATE") {
        profile.stale_rate = raw.parse().context("SWEEP_SIM_STALE_RATE")?;
    }
    if let Ok(raw) = std::env::var("SWEEP_SIM_SEED") {
        profile.seed = raw.parse().context("SWEEP_SIM_SEED")?;
    }
    Ok(profile)
}

async fn run() -> anyhow::Result<RunOutcome> {
    let config = load_config()?;
    let factory = SimulatedActuatorFactory::new(simulation_profile()?);
    let orchestrator = Orchestrator::new(config, factory)?;

    let shutdown = orchestrator.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, shutting down");
            shutdown.trigger();
        }
    });

    let summary = orchestrator.run().await?;
    info!("\n{summary}");
    Ok(summary.outcome)
}

#[tokio::main]
async fn main() -> ExitCode {
    init_structured_logging();

    match run().await {
        Ok(RunOutcome::Completed) => ExitCode::SUCCESS,
        Ok(RunOutcome::Interrupted) => ExitCode::from(130),
        Ok(RunOutcome::Abandoned) => ExitCode::from(2),
        Err(e) => {
            error!(error = %format!("{e:#}"), "💥 Sweep failed");
            ExitCode::FAILURE
        }
    }
}
