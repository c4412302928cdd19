//! # Task Catalog
//!
//! Deterministic enumeration of the full work set: every `HH:MM` slot from a
//! start time to an end time (inclusive) at a fixed minute interval. Computed
//! once at the start of a run and never mutated.

use chrono::{NaiveTime, Timelike};
use thiserror::Error;

use crate::config::CatalogConfig;
use crate::models::TaskId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Invalid time '{value}': expected a 24-hour HH:MM time")]
    InvalidTime { value: String },
    #[error("Interval must be greater than zero minutes")]
    ZeroInterval,
    #[error("Empty range: start {start} is after end {end}")]
    EmptyRange { start: String, end: String },
}

/// Parse a 24-hour `HH:MM` time of day
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime, CatalogError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| CatalogError::InvalidTime {
        value: value.to_string(),
    })
}

/// Every slot from `start` to `end` inclusive, stepping by `interval_minutes`.
///
/// Ids are zero-padded, so the returned vector is sorted both lexically and
/// chronologically. The last slot is the largest one not after `end`.
pub fn generate_time_slots(
    start: &str,
    end: &str,
    interval_minutes: u32,
) -> Result<Vec<TaskId>, CatalogError> {
    if interval_minutes == 0 {
        return Err(CatalogError::ZeroInterval);
    }

    let start_time = parse_time_of_day(start)?;
    let end_time = parse_time_of_day(end)?;
    if start_time > end_time {
        return Err(CatalogError::EmptyRange {
            start: start.to_string(),
            end: end.to_string(),
        });
    }

    let first = minutes_since_midnight(start_time);
    let last = minutes_since_midnight(end_time);

    Ok((first..=last)
        .step_by(interval_minutes as usize)
        .map(|minute| TaskId::new(format!("{:02}:{:02}", minute / 60, minute % 60)))
        .collect())
}

/// Build the catalog described by a configuration section
pub fn build_catalog(config: &CatalogConfig) -> Result<Vec<TaskId>, CatalogError> {
    generate_time_slots(&config.start_time, &config.end_time, config.interval_minutes)
}

fn minutes_since_midnight(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}
