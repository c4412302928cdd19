//! End-of-run summary: counts, basic statistics over committed metrics, and
//! the task ids still missing.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::constants::SUMMARY_MISSING_PREVIEW;
use crate::models::{BacktestResult, TaskId};
use crate::orchestration::progress::format_duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every catalog task has a committed result
    Completed,
    /// Shutdown was requested before completion
    Interrupted,
    /// Every worker died and the replacement budget ran out
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    pub fn from_values<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        (count > 0).then(|| Self {
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcome: RunOutcome,
    pub total: usize,
    pub completed: usize,
    pub missing: Vec<TaskId>,
    pub cagr: Option<MetricStats>,
    pub max_drawdown: Option<MetricStats>,
    pub win_percentage: Option<MetricStats>,
    pub mar: Option<MetricStats>,
    pub elapsed: Duration,
    pub run_directory: PathBuf,
    pub export_path: Option<PathBuf>,
}

impl RunSummary {
    /// Build a summary over the catalog's results
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        run_id: Uuid,
        outcome: RunOutcome,
        total: usize,
        results: &[BacktestResult],
        missing: Vec<TaskId>,
        elapsed: Duration,
        run_directory: PathBuf,
        export_path: Option<PathBuf>,
    ) -> Self {
        Self {
            run_id,
            outcome,
            total,
            completed: results.len(),
            missing,
            cagr: MetricStats::from_values(results.iter().map(|r| r.metrics.cagr)),
            max_drawdown: MetricStats::from_values(results.iter().map(|r| r.metrics.max_drawdown)),
            win_percentage: MetricStats::from_values(
                results.iter().map(|r| r.metrics.win_percentage),
            ),
            mar: MetricStats::from_values(results.iter().map(|r| r.mar)),
            elapsed,
            run_directory,
            export_path,
        }
    }

    /// First few missing ids, with a count of the rest
    pub fn missing_preview(&self) -> String {
        let shown: Vec<&str> = self
            .missing
            .iter()
            .take(SUMMARY_MISSING_PREVIEW)
            .map(TaskId::as_str)
            .collect();
        let mut preview = shown.join(", ");
        if self.missing.len() > SUMMARY_MISSING_PREVIEW {
            preview.push_str(&format!(
                " ... and {} more",
                self.missing.len() - SUMMARY_MISSING_PREVIEW
            ));
        }
        preview
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {} ({:?})", self.run_id, self.outcome)?;
        writeln!(
            f,
            "  Completed: {}/{} in {}",
            self.completed,
            self.total,
            format_duration(self.elapsed)
        )?;
        for (label, stats) in [
            ("CAGR", self.cagr),
            ("Max Drawdown", self.max_drawdown),
            ("Win Percentage", self.win_percentage),
            ("MAR", self.mar),
        ] {
            if let Some(stats) = stats {
                writeln!(
                    f,
                    "  {label}: avg {:.4} / min {:.4} / max {:.4}",
                    stats.mean, stats.min, stats.max
                )?;
            }
        }
        if !self.missing.is_empty() {
            writeln!(f, "  Missing ({}): {}", self.missing.len(), self.missing_preview())?;
        }
        write!(f, "  Output: {}", self.run_directory.display())
    }
}
