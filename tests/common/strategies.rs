#![allow(dead_code)]

use proptest::prelude::*;
use sweep_core::models::RawMetrics;

/// A value already on decimal scale
pub fn decimal_value_strategy() -> impl Strategy<Value = f64> {
    -1.0f64..=1.0
}

/// A value on either decimal or percentage scale, including percentages
/// above 100 (a 250% CAGR is routine for options strategies)
pub fn metric_value_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![
        decimal_value_strategy(),
        -1000.0f64..=-1.0001,
        1.0001f64..=1000.0
    ]
}

pub fn decimal_metrics_strategy() -> impl Strategy<Value = RawMetrics> {
    (
        decimal_value_strategy(),
        decimal_value_strategy(),
        decimal_value_strategy(),
        decimal_value_strategy(),
    )
        .prop_map(|(cagr, max_drawdown, win_percentage, capture_rate)| {
            RawMetrics::new(cagr, max_drawdown, win_percentage, capture_rate)
        })
}

pub fn raw_metrics_strategy() -> impl Strategy<Value = RawMetrics> {
    (
        metric_value_strategy(),
        metric_value_strategy(),
        metric_value_strategy(),
        metric_value_strategy(),
    )
        .prop_map(|(cagr, max_drawdown, win_percentage, capture_rate)| {
            RawMetrics::new(cagr, max_drawdown, win_percentage, capture_rate)
        })
}

/// A `(start, end, interval)` triple with `start <= end`, in minutes since midnight
pub fn slot_range_strategy() -> impl Strategy<Value = (u32, u32, u32)> {
    (0u32..1440, 0u32..1440, 1u32..120).prop_map(|(a, b, interval)| {
        if a <= b {
            (a, b, interval)
        } else {
            (b, a, interval)
        }
    })
}

pub fn hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Durations in whole milliseconds between 1ms and 10 minutes
pub fn durations_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..600_000, 0..20)
}
