//! Resident scheduling loop
//!
//! Runs one backup cycle immediately at startup, then sleeps until each
//! next cron firing. Cycles run inline on this task, so a long cycle
//! cannot overlap the next one; firings that pass while a cycle is still
//! running are skipped with a warning rather than queued.

use crate::managers::backup::BackupManager;
use crate::utils::cron::CronSchedule;
use crate::utils::locker::{CycleLock, DEFAULT_LOCK_PATH};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use chrono_tz::Tz;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

pub struct Scheduler {
    manager: BackupManager,
    schedule: CronSchedule,
    timezone: Tz,
    lock_path: PathBuf,
}

impl Scheduler {
    pub fn new(manager: BackupManager) -> Result<Self> {
        let config = manager.config();
        let schedule = CronSchedule::parse(&config.schedule)
            .with_context(|| format!("invalid schedule '{}'", config.schedule))?;
        let timezone = config.timezone;
        Ok(Self {
            manager,
            schedule,
            timezone,
            lock_path: PathBuf::from(DEFAULT_LOCK_PATH),
        })
    }

    /// Override the cycle lock file location.
    pub fn with_lock_path(mut self, path: PathBuf) -> Self {
        self.lock_path = path;
        self
    }

    /// Run forever. Returns only on setup errors or a schedule with no
    /// future occurrence.
    pub async fn run(&self) -> Result<()> {
        info!(
            schedule = %self.schedule.expression(),
            timezone = %self.timezone,
            "scheduler starting, running initial backup cycle"
        );
        self.guarded_cycle().await;

        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now, self.timezone) else {
                bail!(
                    "schedule '{}' has no future occurrence",
                    self.schedule.expression()
                );
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next.with_timezone(&self.timezone), "next backup scheduled");
            tokio::time::sleep(wait).await;

            self.guarded_cycle().await;

            // Firings that came due while the cycle ran are dropped.
            for missed in missed_firings(&self.schedule, next, Utc::now(), self.timezone) {
                warn!(
                    firing = %missed.with_timezone(&self.timezone),
                    "cycle overran its slot, skipping missed firing"
                );
            }
        }
    }

    async fn guarded_cycle(&self) {
        let mut lock = match CycleLock::new(&self.lock_path) {
            Ok(lock) => lock,
            Err(err) => {
                error!(path = %self.lock_path.display(), %err, "failed to open lock file");
                return;
            }
        };
        match lock.try_guard() {
            Ok(Some(_guard)) => {
                if let Err(err) = self.manager.run_cycle().await {
                    error!(%err, "backup cycle failed");
                }
            }
            Ok(None) => {
                warn!(
                    path = %self.lock_path.display(),
                    "another process holds the cycle lock, skipping this cycle"
                );
            }
            Err(err) => {
                error!(path = %self.lock_path.display(), %err, "cycle lock error");
            }
        };
    }
}

/// Firings strictly between the last handled one and `now`. These came due
/// while a cycle was still running and are skipped, one warning each.
fn missed_firings(
    schedule: &CronSchedule,
    fired: chrono::DateTime<Utc>,
    now: chrono::DateTime<Utc>,
    timezone: Tz,
) -> Vec<chrono::DateTime<Utc>> {
    let mut missed = Vec::new();
    let mut cursor = fired;
    while let Some(next) = schedule.next_after(cursor, timezone) {
        if next >= now {
            break;
        }
        missed.push(next);
        cursor = next;
    }
    missed
}
