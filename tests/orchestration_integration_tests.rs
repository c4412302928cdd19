mod common;

use common::{fast_config, MockActuatorFactory, MockScript};
use std::collections::HashSet;
use std::time::Duration;
use sweep_core::actuator::simulated::simulated_metrics;
use sweep_core::models::{RunState, TaskId};
use sweep_core::orchestration::{Orchestrator, RunOutcome};
use sweep_core::persistence::ResultJournal;
use sweep_core::SweepError;
use tempfile::TempDir;

const RUN_DEADLINE: Duration = Duration::from_secs(20);

async fn run_to_end(
    config: sweep_core::SweepConfig,
    factory: MockActuatorFactory,
) -> sweep_core::Result<sweep_core::orchestration::RunSummary> {
    let orchestrator = Orchestrator::new(config, factory).unwrap();
    tokio::time::timeout(RUN_DEADLINE, orchestrator.run())
        .await
        .expect("run did not finish in time")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_six_tasks_complete_and_export_in_order() {
    let out = TempDir::new().unwrap();
    let config = fast_config(out.path(), "10:00", "10:05");
    let factory = MockActuatorFactory::default();

    let summary = run_to_end(config, factory.clone()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.total, 6);
    assert_eq!(summary.completed, 6);
    assert!(summary.missing.is_empty());

    let csv = std::fs::read_to_string(summary.export_path.unwrap()).unwrap();
    let ids: Vec<&str> = csv
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    assert_eq!(ids, vec!["10:00", "10:01", "10:02", "10:03", "10:04", "10:05"]);

    let progress = RunState::load(&summary.run_directory.join("progress.json")).unwrap();
    assert_eq!(progress.completed_tasks, 6);
    assert_eq!(progress.completion_percentage, 100.0);

    // Every initialized session was shut down
    let ledger = factory.ledger.lock();
    assert_eq!(ledger.shutdowns, ledger.initialized.len());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_transient_failures_are_retried_until_committed() {
    let out = TempDir::new().unwrap();
    let config = fast_config(out.path(), "10:00", "10:05");
    let mut script = MockScript::default();
    script.failures_before_success.insert(TaskId::from("10:02"), 2);
    script.failures_before_success.insert(TaskId::from("10:04"), 1);
    let factory = MockActuatorFactory::new(script);

    let summary = run_to_end(config, factory.clone()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.completed, 6);
    assert_eq!(factory.runs_of("10:02"), 3);
    assert_eq!(factory.runs_of("10:04"), 2);
    assert_eq!(factory.runs_of("10:00"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_task_lost_when_a_worker_dies() {
    let out = TempDir::new().unwrap();
    let config = fast_config(out.path(), "10:00", "10:09");
    let mut script = MockScript::default();
    script.broken_workers.insert(1);
    script.latency = Duration::from_millis(5);
    let factory = MockActuatorFactory::new(script);

    let summary = run_to_end(config, factory.clone()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.completed, 10);

    let journal =
        ResultJournal::load(&summary.run_directory.join("checkpoint.jsonl")).unwrap();
    assert!(journal.iter().all(|r| r.worker_id != 1));
    assert!(factory.runs_of("10:00") >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_each_task_committed_once() {
    let out = TempDir::new().unwrap();
    let mut config = fast_config(out.path(), "10:00", "10:19");
    config.workers.worker_count = 4;
    let mut script = MockScript::default();
    for minute in 0..20 {
        if minute % 3 == 0 {
            script
                .failures_before_success
                .insert(TaskId::new(format!("10:{minute:02}")), 1);
        }
    }
    let factory = MockActuatorFactory::new(script);

    let summary = run_to_end(config, factory).await.unwrap();
    assert_eq!(summary.completed, 20);

    let journal =
        ResultJournal::load(&summary.run_directory.join("checkpoint.jsonl")).unwrap();
    let unique: HashSet<TaskId> = journal.iter().map(|r| r.task_id.clone()).collect();
    assert_eq!(journal.len(), 20);
    assert_eq!(unique.len(), 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stale_reading_is_replaced_by_reread() {
    let out = TempDir::new().unwrap();
    let mut config = fast_config(out.path(), "10:00", "10:02");
    config.workers.worker_count = 1;
    let mut script = MockScript::default();
    script.stale_once.insert(TaskId::from("10:01"));
    let factory = MockActuatorFactory::new(script);

    let summary = run_to_end(config, factory.clone()).await.unwrap();
    assert_eq!(summary.completed, 3);

    let journal =
        ResultJournal::load(&summary.run_directory.join("checkpoint.jsonl")).unwrap();
    let committed = journal
        .iter()
        .find(|r| r.task_id.as_str() == "10:01")
        .unwrap();
    let expected = simulated_metrics(&TaskId::from("10:01")).normalized();
    assert_eq!(committed.metrics, expected);
    // The stale reading was handled by re-reading, not by re-running
    assert_eq!(factory.runs_of("10:01"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_replacement_workers_finish_the_run() {
    let out = TempDir::new().unwrap();
    let mut config = fast_config(out.path(), "10:00", "10:05");
    config.workers.worker_count = 2;
    let mut script = MockScript::default();
    script.broken_workers.extend([0, 1]);
    let factory = MockActuatorFactory::new(script);

    let summary = run_to_end(config, factory.clone()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(summary.completed, 6);
    let initialized = factory.ledger.lock().initialized.clone();
    assert!(initialized.iter().any(|id| *id >= 100));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_run_abandoned_when_replacements_exhausted() {
    let out = TempDir::new().unwrap();
    let mut config = fast_config(out.path(), "10:00", "10:03");
    config.workers.worker_count = 2;
    config.orchestrator.max_replacement_workers = 2;
    let factory = MockActuatorFactory::new(MockScript {
        all_broken: true,
        ..MockScript::default()
    });

    let summary = run_to_end(config, factory.clone()).await.unwrap();

    assert_eq!(summary.outcome, RunOutcome::Abandoned);
    assert_eq!(summary.completed, 0);
    assert_eq!(summary.missing.len(), 4);
    assert_eq!(factory.ledger.lock().initialized.len(), 4);
    // The export is written even though nothing completed
    assert!(summary.export_path.unwrap().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_workers_initialize_is_run_fatal() {
    let out = TempDir::new().unwrap();
    let config = fast_config(out.path(), "10:00", "10:03");
    let factory = MockActuatorFactory::new(MockScript {
        fail_all_inits: true,
        ..MockScript::default()
    });

    let err = run_to_end(config, factory.clone()).await.unwrap_err();
    assert!(matches!(err, SweepError::NoWorkersAvailable(_)));
    assert_eq!(factory.ledger.lock().total_runs(), 0);

    // Best-effort export still happened
    let run_dir = std::fs::read_dir(out.path())
        .unwrap()
        .next()
        .unwrap()
        .unwrap()
        .path();
    assert!(run_dir.join("results.csv").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_interrupts_run() {
    let out = TempDir::new().unwrap();
    let mut config = fast_config(out.path(), "10:00", "10:30");
    config.orchestrator.join_timeout_ms = 200;
    let factory = MockActuatorFactory::new(MockScript {
        latency: Duration::from_secs(10),
        ..MockScript::default()
    });

    let orchestrator = Orchestrator::new(config, factory).unwrap();
    let shutdown = orchestrator.shutdown_signal();
    let run = tokio::spawn(orchestrator.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown.trigger();

    let summary = tokio::time::timeout(RUN_DEADLINE, run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(summary.outcome, RunOutcome::Interrupted);
    assert_eq!(summary.missing.len(), 31);
    assert!(summary.export_path.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_resume_skips_journaled_tasks() {
    let out = TempDir::new().unwrap();
    let first = run_to_end(
        fast_config(out.path(), "10:00", "10:03"),
        MockActuatorFactory::default(),
    )
    .await
    .unwrap();
    assert_eq!(first.completed, 4);

    let mut config = fast_config(out.path(), "10:00", "10:05");
    config.checkpoint.resume_from = Some(first.run_directory.clone());
    let factory = MockActuatorFactory::default();
    let second = run_to_end(config, factory.clone()).await.unwrap();

    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(second.completed, 6);
    assert_eq!(second.run_directory, first.run_directory);
    assert_eq!(factory.ledger.lock().total_runs(), 2);
    assert_eq!(factory.runs_of("10:04"), 1);
    assert_eq!(factory.runs_of("10:00"), 0);

    let journal = ResultJournal::load(&second.run_directory.join("checkpoint.jsonl")).unwrap();
    assert_eq!(journal.len(), 6);
}
