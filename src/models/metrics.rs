use serde::{Deserialize, Serialize};

/// Metrics as read from the actuator.
///
/// Values may arrive on percentage scale (`12.5` meaning 12.5%) or decimal
/// scale (`0.125`). [`RawMetrics::normalized`] folds both onto decimal scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub cagr: f64,
    pub max_drawdown: f64,
    pub win_percentage: f64,
    pub capture_rate: f64,
}

impl RawMetrics {
    pub fn new(cagr: f64, max_drawdown: f64, win_percentage: f64, capture_rate: f64) -> Self {
        Self {
            cagr,
            max_drawdown,
            win_percentage,
            capture_rate,
        }
    }

    /// Fold every field onto decimal scale. A no-op on decimal-scale input;
    /// apply it exactly once to a reading, since `250.0` becomes `2.5`.
    pub fn normalized(&self) -> Self {
        Self {
            cagr: normalize_value(self.cagr),
            max_drawdown: normalize_value(self.max_drawdown),
            win_percentage: normalize_value(self.win_percentage),
            capture_rate: normalize_value(self.capture_rate),
        }
    }

    /// Ratio of growth to drawdown, `|cagr / max_drawdown|`, or zero without a drawdown
    pub fn mar(&self) -> f64 {
        if self.max_drawdown != 0.0 {
            (self.cagr / self.max_drawdown).abs()
        } else {
            0.0
        }
    }

    /// True when every tracked field differs from `other` by less than `tolerance`
    pub fn within_tolerance(&self, other: &RawMetrics, tolerance: f64) -> bool {
        (self.cagr - other.cagr).abs() < tolerance
            && (self.max_drawdown - other.max_drawdown).abs() < tolerance
            && (self.win_percentage - other.win_percentage).abs() < tolerance
            && (self.capture_rate - other.capture_rate).abs() < tolerance
    }

    pub fn is_finite(&self) -> bool {
        self.cagr.is_finite()
            && self.max_drawdown.is_finite()
            && self.win_percentage.is_finite()
            && self.capture_rate.is_finite()
    }
}

/// Percentage-scale values (magnitude above 1) are divided by 100
pub fn normalize_value(value: f64) -> f64 {
    if value.abs() > 1.0 {
        value / 100.0
    } else {
        value
    }
}
