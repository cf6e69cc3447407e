//! Logging setup with optional file rotation
//!
//! Console output (stderr, INFO) is always on. When a log directory is
//! configured, a second layer writes daily-rotated files at the configured
//! level and old files beyond the retention limit are removed at startup.

use crate::config::LoggingSettings;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const LOG_FILE_PREFIX: &str = "db-backup";

/// Keeps the file writer alive; dropping it flushes remaining logs.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize logging per the resolved settings.
///
/// The returned guard must be held for the duration of the program.
pub fn init_logging(settings: &LoggingSettings) -> Result<LogGuard> {
    // Built via a closure because the two subscriber stacks below have
    // different types, so a single layer binding cannot serve both.
    let console_layer = || {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_span_events(FmtSpan::NONE)
            .with_filter(level_filter(Level::INFO))
    };

    let Some(directory) = &settings.directory else {
        tracing_subscriber::registry().with(console_layer()).init();
        return Ok(LogGuard { _file_guard: None });
    };

    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {:?}", directory))?;

    let file_appender = RollingFileAppender::new(
        Rotation::DAILY,
        directory,
        format!("{LOG_FILE_PREFIX}.log"),
    );
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .with_filter(level_filter(parse_level(&settings.level)));

    tracing_subscriber::registry()
        .with(console_layer())
        .with(file_layer)
        .init();

    cleanup_old_logs(directory, settings.max_files)?;

    Ok(LogGuard {
        _file_guard: Some(file_guard),
    })
}

/// Console-only logging for paths where full setup is not wanted, such as
/// configuration validation.
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn level_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = EnvFilter::new(format!("db_backup={level}"));
        if let Ok(directive) = format!("{level}").parse() {
            filter = filter.add_directive(directive);
        }
        filter
    })
}

/// Remove rotated log files beyond the retention limit, newest kept.
fn cleanup_old_logs(log_dir: &Path, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.starts_with(LOG_FILE_PREFIX) && name.contains(".log")
        })
        .collect();

    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("removed old log file {:?}", file.path());
        }
    }

    Ok(())
}
