pub mod command;
pub mod cron;
pub mod database;
pub mod executor;
pub mod gzip;
pub mod locker;
pub mod s3;

pub use executor::{CommandExecutor, SystemExecutor};
