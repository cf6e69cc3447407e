//! Database backup daemon library
//!
//! Enumerates the user databases on configured PostgreSQL and MySQL
//! servers, dumps each one with the native client tools, compresses the
//! dumps, and uploads them to S3 on a cron schedule.

pub mod config;
pub mod error;
pub mod managers;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, S3Config, ServerConfig, ServerKind};
pub use error::BackupError;
pub use managers::backup::{remote_key, BackupManager, CycleSummary};
pub use managers::logging::{init_console_logging, init_logging, LogGuard};
pub use managers::scheduler::Scheduler;
pub use utils::executor::{CommandExecutor, SystemExecutor};
