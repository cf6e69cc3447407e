//! Test utilities for db-backup
//!
//! Shared fixtures and re-exports for exercising the backup pipeline
//! against mocked tool invocations.

pub mod fixtures;

pub use fixtures::*;

// Re-export types from the main crate for convenience
pub use db_backup::config::{Config, LoggingSettings, S3Config, ServerConfig, ServerKind};
pub use db_backup::managers::backup::{remote_key, BackupManager, CycleSummary};
pub use db_backup::utils::executor::mock::{CommandCall, MockExecutor, MockResponse};
pub use db_backup::utils::executor::CommandExecutor;

/// Common test result type
pub type TestResult<T = ()> = anyhow::Result<T>;
