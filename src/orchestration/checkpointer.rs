//! # Checkpointer
//!
//! Periodically writes the run state to `progress.json` and, each time
//! completion crosses a new milestone, an immutable snapshot plus a CSV backup
//! under `backups/`. Every write is best-effort: failures are logged and the
//! run carries on.

use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::SweepContext;
use crate::error::PersistenceResult;
use crate::logging::log_error;
use crate::models::RunState;
use crate::persistence::{write_atomic, write_results_csv, RunDirectory};

#[derive(Debug)]
pub struct Checkpointer {
    run_id: Uuid,
    context: SweepContext,
    directory: RunDirectory,
    /// Highest milestone already snapshotted, in percent
    last_milestone: AtomicU32,
}

impl Checkpointer {
    pub fn new(run_id: Uuid, context: SweepContext, directory: RunDirectory) -> Self {
        Self {
            run_id,
            context,
            directory,
            last_milestone: AtomicU32::new(0),
        }
    }

    pub fn directory(&self) -> &RunDirectory {
        &self.directory
    }

    pub fn snapshot(&self) -> RunState {
        RunState::new(
            self.run_id,
            self.context.config.as_ref().clone(),
            self.context.catalog.iter().cloned().collect(),
            self.context.results.sorted_results(),
        )
    }

    /// Write the primary checkpoint and any newly reached milestone snapshot
    pub fn checkpoint(&self) -> PersistenceResult<RunState> {
        let state = self.snapshot();
        write_atomic(&self.directory.progress_path(), state.to_pretty_json()?.as_bytes())?;

        debug!(
            completed = state.completed_tasks,
            total = state.total_tasks,
            "💾 CHECKPOINT: Progress saved"
        );

        self.write_milestone(&state)?;
        Ok(state)
    }

    fn write_milestone(&self, state: &RunState) -> PersistenceResult<()> {
        let step = self.context.config.checkpoint.milestone_percent.max(1);
        let reached = (state.completion_percentage.floor() as u32 / step) * step;
        if reached == 0 || reached <= self.last_milestone.load(Ordering::Acquire) {
            return Ok(());
        }

        let now = Local::now();
        write_atomic(
            &self.directory.milestone_snapshot_path(reached, now),
            state.to_pretty_json()?.as_bytes(),
        )?;
        write_results_csv(
            &self.directory.milestone_csv_path(reached, now),
            &state.completed_results,
        )?;
        self.last_milestone.fetch_max(reached, Ordering::AcqRel);

        info!(
            milestone_percent = reached,
            completed = state.completed_tasks,
            total = state.total_tasks,
            "💾 CHECKPOINT: Milestone snapshot written"
        );
        Ok(())
    }

    /// Checkpoint, logging instead of returning any failure
    pub fn checkpoint_best_effort(&self) {
        if let Err(e) = self.checkpoint() {
            log_error("checkpointer", "checkpoint", &e.to_string(), None);
        }
    }

    /// Final checkpoint plus `results.csv`. Returns the CSV path on success.
    pub fn finalize(&self) -> PersistenceResult<PathBuf> {
        let state = self.snapshot();
        let progress = write_atomic(&self.directory.progress_path(), state.to_pretty_json()?.as_bytes());

        let csv_path = self.directory.results_csv_path();
        write_results_csv(&csv_path, &state.completed_results)?;
        progress?;

        info!(
            results = state.completed_tasks,
            csv = %csv_path.display(),
            "💾 CHECKPOINT: Final export written"
        );
        Ok(csv_path)
    }

    /// Checkpoint every `checkpoint.interval_ms` until shutdown
    #[instrument(skip(self))]
    pub async fn run(self: Arc<Self>) {
        let interval = self.context.config.checkpoint.interval();
        info!(
            interval_ms = interval.as_millis() as u64,
            directory = %self.directory.root().display(),
            "💾 CHECKPOINT: Started"
        );

        while self.context.shutdown.sleep(interval).await {
            self.checkpoint_best_effort();
        }

        info!("💾 CHECKPOINT: Stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SweepConfig;
    use crate::models::{BacktestResult, RawMetrics, TaskId};
    use crate::orchestration::ResultStore;
    use tempfile::TempDir;

    fn setup(tasks: usize) -> (TempDir, Checkpointer, SweepContext) {
        let dir = TempDir::new().unwrap();
        let run_dir = RunDirectory::create(dir.path(), "test").unwrap();
        let catalog: Vec<TaskId> = (0..tasks).map(|i| TaskId::new(format!("10:{i:02}"))).collect();
        let mut config = SweepConfig::default();
        config.checkpoint.milestone_percent = 25;
        let context = SweepContext::new(config, catalog, ResultStore::new());
        let checkpointer = Checkpointer::new(Uuid::new_v4(), context.clone(), run_dir);
        (dir, checkpointer, context)
    }

    fn complete(context: &SweepContext, index: usize) {
        context.results.commit(BacktestResult::from_reading(
            TaskId::new(format!("10:{index:02}")),
            RawMetrics::new(0.1, -0.1, 0.5, 0.1),
            0,
        ));
    }

    fn backups(checkpointer: &Checkpointer) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(checkpointer.directory().backups_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_checkpoint_writes_reloadable_progress() {
        let (_dir, checkpointer, context) = setup(4);
        complete(&context, 0);
        checkpointer.checkpoint().unwrap();

        let loaded = RunState::load(&checkpointer.directory().progress_path()).unwrap();
        assert_eq!(loaded.completed_tasks, 1);
        assert_eq!(loaded.total_tasks, 4);
        assert_eq!(loaded.completion_percentage, 25.0);
    }

    #[test]
    fn test_milestones_written_once_each() {
        let (_dir, checkpointer, context) = setup(8);
        checkpointer.checkpoint().unwrap();
        assert!(backups(&checkpointer).is_empty());

        complete(&context, 0);
        complete(&context, 1);
        checkpointer.checkpoint().unwrap();
        checkpointer.checkpoint().unwrap();
        let names = backups(&checkpointer);
        assert_eq!(names.len(), 2);
        assert!(names.iter().all(|n| n.starts_with("backup_25pct_")));

        // Jumping past several milestones writes only the highest
        for i in 2..7 {
            complete(&context, i);
        }
        checkpointer.checkpoint().unwrap();
        let names = backups(&checkpointer);
        assert_eq!(names.len(), 4);
        assert!(names.iter().any(|n| n.starts_with("backup_75pct_")));
    }

    #[test]
    fn test_finalize_writes_csv() {
        let (_dir, checkpointer, context) = setup(2);
        complete(&context, 1);
        let csv = checkpointer.finalize().unwrap();
        let content = std::fs::read_to_string(csv).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(checkpointer.directory().progress_path().exists());
    }
}
