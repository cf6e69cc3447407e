//! Backup orchestration
//!
//! A cycle walks every active server kind, enumerates its user databases,
//! and for each one dumps, compresses, uploads, and deletes the local
//! artifacts. Failures are isolated per database; an enumeration failure
//! abandons that kind and moves on to the next.

use crate::config::{Config, ServerConfig, ServerKind};
use crate::error::BackupError;
use crate::utils::executor::{CommandExecutor, SystemExecutor};
use crate::utils::{database, gzip, s3};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, error, info, warn};

/// Outcome of one backup cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl CycleSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct BackupManager {
    config: Config,
    executor: Arc<dyn CommandExecutor>,
}

impl BackupManager {
    pub fn new(config: Config) -> Self {
        Self::with_executor(config, Arc::new(SystemExecutor::new()))
    }

    pub fn with_executor(config: Config, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { config, executor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one full backup cycle over all active server kinds.
    pub async fn run_cycle(&self) -> Result<CycleSummary> {
        let work_dir = TempDir::new().context("failed to create working directory")?;
        debug!(path = %work_dir.path().display(), "created cycle working directory");

        let mut summary = CycleSummary::default();

        for kind in ServerKind::ALL {
            let Some(server) = self.config.server(kind) else {
                debug!(%kind, "kind not configured, skipping");
                continue;
            };

            let databases = match database::list_databases(
                self.executor.as_ref(),
                kind,
                server,
                self.config.command_timeout(),
            )
            .await
            {
                Ok(databases) => databases,
                Err(err) => {
                    error!(%kind, %err, "database enumeration failed, skipping kind");
                    summary.failed += 1;
                    continue;
                }
            };

            if databases.is_empty() {
                info!(%kind, "no user databases to back up");
                continue;
            }
            info!(%kind, count = databases.len(), "backing up databases");

            for db in &databases {
                match self.backup_database(kind, server, db, work_dir.path()).await {
                    Ok(()) => summary.succeeded += 1,
                    Err(err) => {
                        error!(%kind, database = %db, %err, "backup failed");
                        summary.failed += 1;
                    }
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "backup cycle finished"
        );
        Ok(summary)
    }

    /// Enumerate one kind's user databases, for ad-hoc inspection.
    pub async fn list_kind(&self, kind: ServerKind) -> crate::error::Result<Vec<String>> {
        let server = self
            .config
            .server(kind)
            .ok_or_else(|| BackupError::Enumeration {
                kind,
                code: None,
                stderr: format!("{kind} is not configured"),
            })?;
        database::list_databases(
            self.executor.as_ref(),
            kind,
            server,
            self.config.command_timeout(),
        )
        .await
    }

    async fn backup_database(
        &self,
        kind: ServerKind,
        server: &ServerConfig,
        db: &str,
        work_dir: &Path,
    ) -> crate::error::Result<()> {
        let key = remote_key(db, kind, Utc::now());
        let dump_path = work_dir.join(format!("{db}.sql"));
        let timeout = self.config.command_timeout();

        info!(%kind, database = %db, "dumping database");
        database::dump_database(
            self.executor.as_ref(),
            kind,
            server,
            db,
            &dump_path,
            timeout,
        )
        .await?;

        let archive = gzip::compress_file(self.executor.as_ref(), &dump_path, timeout).await?;
        let size = fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
        info!(
            database = %db,
            size = %format_size(size),
            key = %key,
            "uploading archive"
        );

        let uploaded = s3::upload_file(
            self.executor.as_ref(),
            self.config.s3.as_ref(),
            &archive,
            &key,
            timeout,
        )
        .await;

        // The archive is removed whether or not the upload went through;
        // a failed upload is retried from a fresh dump on the next cycle.
        // Removal failures are logged only, so they never shadow the
        // upload outcome; the cycle temp dir sweeps any leftover.
        remove_if_present(&archive);
        uploaded
    }
}

/// Remote object key for one database dump. The timestamp is RFC 3339 UTC
/// with millisecond precision, colons replaced so the key stays portable.
pub fn remote_key(database: &str, kind: ServerKind, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace(':', "-");
    format!("{database}/{stamp}.{}.sql.gz", kind.tag())
}

fn remove_if_present(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(path = %path.display(), %err, "failed to remove local artifact"),
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_remote_key_format() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            remote_key("orders", ServerKind::Postgres, at),
            "orders/2024-01-02T03-04-05.000Z.pg.sql.gz"
        );
        assert_eq!(
            remote_key("shop", ServerKind::MySql, at),
            "shop/2024-01-02T03-04-05.000Z.mysql.sql.gz"
        );
    }

    #[test]
    fn test_remote_key_has_no_colons() {
        let key = remote_key("db", ServerKind::Postgres, Utc::now());
        assert!(!key.contains(':'));
    }

    #[test]
    fn test_artifact_removal_failure_is_not_fatal() {
        // A directory cannot be removed with remove_file; the failure is
        // logged and swallowed so the backup outcome is reported instead.
        let dir = tempfile::tempdir().unwrap();
        let stubborn = dir.path().join("app.sql.gz");
        std::fs::create_dir(&stubborn).unwrap();
        std::fs::write(stubborn.join("inner"), "x").unwrap();

        remove_if_present(&stubborn);
        assert!(stubborn.exists());

        // Missing files are equally fine.
        remove_if_present(&dir.path().join("never-existed.gz"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }
}
