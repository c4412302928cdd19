//! # Data Models
//!
//! Plain data carried between the orchestration components:
//!
//! - [`TaskId`] - `HH:MM` slot identifier, the join key everywhere
//! - [`RawMetrics`] - one reading from the actuator, with normalization rules
//! - [`BacktestResult`] - a committed, normalized result
//! - [`RunState`] - the checkpoint payload

pub mod metrics;
pub mod result;
pub mod run_state;
pub mod task_id;

pub use metrics::RawMetrics;
pub use result::BacktestResult;
pub use run_state::RunState;
pub use task_id::TaskId;
