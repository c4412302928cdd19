#![allow(clippy::doc_markdown)] // Allow technical terms like CAGR, MAR in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Sweep Core Rust
//!
//! Fault-tolerant orchestration core for long-running parameter sweeps.
//!
//! ## Overview
//!
//! A sweep runs one backtest per entry-time slot against an external, flaky
//! actuator (typically a browser session against a third-party web application).
//! Each backtest takes minutes, can hang, and can return the previous backtest's
//! numbers. This crate drives the full set of slots to completion across a pool
//! of concurrent workers with at-least-once execution, duplicate suppression,
//! adaptive timeouts and periodic checkpoints that survive interruption.
//!
//! ## Module Organization
//!
//! - [`catalog`] - Deterministic enumeration of the time-slot grid
//! - [`actuator`] - The port each worker drives, plus a simulated implementation
//! - [`orchestration`] - Queue, claims, results, workers, watchdog, checkpointer, orchestrator
//! - [`persistence`] - Run directory, result journal, CSV export
//! - [`models`] - Task identifiers, metrics, results and checkpoint payloads
//! - [`config`] - YAML configuration with environment overrides
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured `tracing` setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sweep_core::actuator::simulated::SimulatedActuatorFactory;
//! use sweep_core::config::SweepConfig;
//! use sweep_core::orchestration::Orchestrator;
//!
//! # async fn example() -> sweep_core::Result<()> {
//! let config = SweepConfig::default();
//! let factory = SimulatedActuatorFactory::default();
//! let orchestrator = Orchestrator::new(config, factory)?;
//! let summary = orchestrator.run().await?;
//! println!("completed {} of {}", summary.completed, summary.total);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod actuator;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod persistence;

pub use config::{ConfigManager, SweepConfig};
pub use error::{Result, SweepError};
pub use models::{BacktestResult, RawMetrics, RunState, TaskId};
