//! Tabular export of committed results, sorted by task id, six decimal places.

use std::path::Path;

use super::run_directory::write_atomic;
use crate::constants::CSV_HEADERS;
use crate::error::PersistenceResult;
use crate::models::BacktestResult;

/// Render results as CSV text. Rows are ordered by task id regardless of input order.
pub fn render_results_csv(results: &[BacktestResult]) -> String {
    let mut sorted: Vec<&BacktestResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.task_id.cmp(&b.task_id));

    let mut out = CSV_HEADERS.join(",");
    out.push('\n');

    for result in sorted {
        let row = [
            escape_field(result.task_id.as_str()),
            format!("{:.6}", result.metrics.cagr),
            format!("{:.6}", result.metrics.max_drawdown),
            format!("{:.6}", result.metrics.win_percentage),
            format!("{:.6}", result.metrics.capture_rate),
            format!("{:.6}", result.mar),
            result.worker_id.to_string(),
            result.completed_at.to_rfc3339(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

pub fn write_results_csv(path: &Path, results: &[BacktestResult]) -> PersistenceResult<()> {
    write_atomic(path, render_results_csv(results).as_bytes())
}

fn escape_field(value: &str) -> String {
    if value.contains(|c| matches!(c, ',' | '"' | '\n')) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawMetrics, TaskId};

    #[test]
    fn test_rows_sorted_with_six_decimals() {
        let results = vec![
            BacktestResult::from_reading(TaskId::from("11:00"), RawMetrics::new(0.2, -0.1, 0.5, 0.25), 2),
            BacktestResult::from_reading(TaskId::from("10:30"), RawMetrics::new(12.5, -5.0, 60.0, 3.0), 1),
        ];
        let csv = render_results_csv(&results);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(
            lines[0],
            "Task ID,CAGR,Max Drawdown,Win Percentage,Capture Rate,MAR,Worker ID,Completed At"
        );
        assert!(lines[1].starts_with("10:30,0.125000,-0.050000,0.600000,0.030000,2.500000,1,"));
        assert!(lines[2].starts_with("11:00,0.200000,-0.100000,0.500000,0.250000,2.000000,2,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_header_only_when_empty() {
        assert_eq!(render_results_csv(&[]).lines().count(), 1);
    }

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("10:00"), "10:00");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
