//! Backup cycle tests against mocked tool invocations
//!
//! Every external tool call goes through the executor trait, so a full
//! cycle can be driven end to end without any database servers installed.

use std::sync::Arc;
use test_utils::{
    full_config, mysql_listing, mysql_only_config, pg_only_config, pg_only_config_without_s3,
    psql_listing, psql_listing_system_only, BackupManager, MockExecutor, MockResponse,
};

fn manager_with(config: test_utils::Config, mock: &MockExecutor) -> BackupManager {
    BackupManager::with_executor(config, Arc::new(mock.clone()))
}

#[tokio::test]
async fn test_full_cycle_backs_up_every_user_database() {
    let mock = MockExecutor::new()
        .expect("mysql", MockResponse::stdout(mysql_listing()))
        .expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(full_config(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    // shop from MySQL, orders and users from Postgres
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(mock.call_count("mysqldump"), 1);
    assert_eq!(mock.call_count("pg_dump"), 2);
    assert_eq!(mock.call_count("gzip"), 3);
    assert_eq!(mock.call_count("aws"), 3);
}

#[tokio::test]
async fn test_mysql_is_processed_before_postgres() {
    let mock = MockExecutor::new()
        .expect("mysql", MockResponse::stdout(mysql_listing()))
        .expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(full_config(), &mock);

    manager.run_cycle().await.unwrap();

    let programs: Vec<String> = mock.calls().into_iter().map(|c| c.program).collect();
    let mysql_pos = programs.iter().position(|p| p == "mysql").unwrap();
    let psql_pos = programs.iter().position(|p| p == "psql").unwrap();
    assert!(mysql_pos < psql_pos);
}

#[tokio::test]
async fn test_system_databases_are_never_dumped() {
    let mock = MockExecutor::new()
        .expect("psql", MockResponse::stdout(psql_listing_system_only()));
    let manager = manager_with(pg_only_config(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert!(!mock.was_called("pg_dump"));
}

#[tokio::test]
async fn test_inactive_kind_is_not_touched() {
    let mock = MockExecutor::new().expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(pg_only_config(), &mock);

    manager.run_cycle().await.unwrap();

    assert!(!mock.was_called("mysql"));
    assert!(!mock.was_called("mysqldump"));
}

#[tokio::test]
async fn test_dump_failure_does_not_stop_other_databases() {
    let mock = MockExecutor::new()
        .expect("psql", MockResponse::stdout(psql_listing()))
        .expect("pg_dump", MockResponse::failure(1, "connection reset"))
        .expect("pg_dump", MockResponse::ok());
    let manager = manager_with(pg_only_config(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    // orders fails, users still goes through the full pipeline
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(mock.call_count("pg_dump"), 2);
    assert_eq!(mock.call_count("gzip"), 1);
    assert_eq!(mock.call_count("aws"), 1);
}

#[tokio::test]
async fn test_enumeration_failure_skips_kind_but_not_others() {
    let mock = MockExecutor::new()
        .expect("mysql", MockResponse::failure(1, "access denied"))
        .expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(full_config(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    assert!(!mock.was_called("mysqldump"));
    assert_eq!(mock.call_count("pg_dump"), 2);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_upload_failure_counts_as_failed() {
    let mock = MockExecutor::new()
        .expect("mysql", MockResponse::stdout(mysql_listing()))
        .expect("aws", MockResponse::failure(1, "AccessDenied"));
    let manager = manager_with(mysql_only_config(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_missing_s3_config_fails_uploads_without_calling_aws() {
    let mock = MockExecutor::new().expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(pg_only_config_without_s3(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 2);
    assert!(!mock.was_called("aws"));
    // Dumps and compression still ran; the failure is confined to upload.
    assert_eq!(mock.call_count("pg_dump"), 2);
}

#[tokio::test]
async fn test_credentials_travel_via_environment_not_argv() {
    let mock = MockExecutor::new()
        .expect("mysql", MockResponse::stdout(mysql_listing()))
        .expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(full_config(), &mock);

    manager.run_cycle().await.unwrap();

    let psql = &mock.calls_for("psql")[0];
    assert_eq!(psql.env("PGPASSWORD"), Some("pg-secret"));
    assert!(!psql.args.iter().any(|a| a.contains("pg-secret")));

    let mysqldump = &mock.calls_for("mysqldump")[0];
    assert_eq!(mysqldump.env("MYSQL_PWD"), Some("mysql-secret"));

    let aws = &mock.calls_for("aws")[0];
    assert_eq!(aws.env("AWS_ACCESS_KEY_ID"), Some("AKIATEST"));
    assert_eq!(aws.env("AWS_SECRET_ACCESS_KEY"), Some("test-secret"));
    assert!(!aws.args.iter().any(|a| a.contains("test-secret")));
}

#[tokio::test]
async fn test_upload_destination_uses_expected_key_shape() {
    let mock = MockExecutor::new().expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(pg_only_config(), &mock);

    manager.run_cycle().await.unwrap();

    let aws_calls = mock.calls_for("aws");
    assert_eq!(aws_calls.len(), 2);

    let destination = &aws_calls[0].args[3];
    assert!(destination.starts_with("s3://test-bucket/orders/"));
    assert!(destination.ends_with(".pg.sql.gz"));
    // Only the scheme separator carries a colon; timestamps are sanitized.
    assert_eq!(destination.matches(':').count(), 1);

    assert_eq!(aws_calls[0].args[0], "s3");
    assert_eq!(aws_calls[0].args[1], "cp");
}

#[tokio::test]
async fn test_dump_targets_are_per_database_files() {
    let mock = MockExecutor::new().expect("psql", MockResponse::stdout(psql_listing()));
    let manager = manager_with(pg_only_config(), &mock);

    manager.run_cycle().await.unwrap();

    let dumps = mock.calls_for("pg_dump");
    let files: Vec<&String> = dumps
        .iter()
        .flat_map(|c| c.args.iter())
        .filter(|a| a.starts_with("--file="))
        .collect();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("orders.sql"));
    assert!(files[1].ends_with("users.sql"));
    assert_ne!(files[0], files[1]);
}

#[tokio::test]
async fn test_spawn_error_is_isolated_like_any_failure() {
    let mock = MockExecutor::new()
        .expect("mysql", MockResponse::stdout(mysql_listing()))
        .expect(
            "mysqldump",
            MockResponse::SpawnError {
                message: "No such file or directory".to_string(),
            },
        );
    let manager = manager_with(mysql_only_config(), &mock);

    let summary = manager.run_cycle().await.unwrap();

    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 1);
    assert!(!mock.was_called("gzip"));
}
