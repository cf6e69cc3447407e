//! Scheduler behavior tests
//!
//! The scheduler loop never returns on its own, so these tests race it
//! against a short timeout and then inspect what the mock recorded.

use db_backup::managers::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use test_utils::{pg_only_config, psql_listing, BackupManager, MockExecutor, MockResponse};

fn scheduler_with(mock: &MockExecutor, lock_path: std::path::PathBuf) -> Scheduler {
    let manager = BackupManager::with_executor(pg_only_config(), Arc::new(mock.clone()));
    Scheduler::new(manager).unwrap().with_lock_path(lock_path)
}

#[tokio::test]
async fn test_initial_cycle_runs_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let mock = MockExecutor::new().expect("psql", MockResponse::stdout(psql_listing()));
    let scheduler = scheduler_with(&mock, dir.path().join("cycle.lock"));

    // Daily schedule, so within the timeout only the startup cycle fires.
    let raced = tokio::time::timeout(Duration::from_millis(300), scheduler.run()).await;
    assert!(raced.is_err());

    assert_eq!(mock.call_count("psql"), 1);
    assert_eq!(mock.call_count("pg_dump"), 2);
}

#[tokio::test]
async fn test_cycle_is_skipped_when_lock_is_held() {
    let dir = tempfile::tempdir().unwrap();
    let lock_path = dir.path().join("cycle.lock");

    let mut holder = db_backup::utils::locker::CycleLock::new(&lock_path).unwrap();
    let _guard = holder.try_guard().unwrap().unwrap();

    let mock = MockExecutor::new().expect("psql", MockResponse::stdout(psql_listing()));
    let scheduler = scheduler_with(&mock, lock_path);

    let raced = tokio::time::timeout(Duration::from_millis(300), scheduler.run()).await;
    assert!(raced.is_err());

    assert!(!mock.was_called("psql"));
}

#[tokio::test]
async fn test_rejects_invalid_schedule() {
    let config = test_utils::Config {
        schedule: "not a cron".to_string(),
        ..pg_only_config()
    };
    let manager = BackupManager::new(config);
    assert!(Scheduler::new(manager).is_err());
}
