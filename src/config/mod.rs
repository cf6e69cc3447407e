//! Configuration module for db-backup
//!
//! Configuration is environment-driven: every knob is an environment
//! variable with a sensible default. A database kind participates in
//! backups iff its `*_HOST` variable is set and non-empty.
//!
//! ## Example Usage
//!
//! ```no_run
//! use db_backup::config::Config;
//!
//! let config = Config::from_env().expect("invalid environment");
//! for kind in config.active_kinds() {
//!     println!("will back up {kind} databases");
//! }
//! ```

mod loader;
mod types;

pub use loader::{ConfigError, Result, DEFAULT_SCHEDULE};
pub use types::*;
