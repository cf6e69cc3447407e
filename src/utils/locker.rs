//! Advisory file lock preventing concurrent backup cycles
//!
//! A second daemon instance pointed at the same servers would race the
//! first over dump files and S3 keys, so each cycle takes an exclusive
//! lock on a well-known file for its duration.

use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DEFAULT_LOCK_PATH: &str = "/tmp/db-backup.lock";

pub struct CycleLock {
    lock: RwLock<File>,
    path: PathBuf,
}

impl CycleLock {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        Ok(Self {
            lock: RwLock::new(file),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lock without blocking. Returns `None` when another
    /// process holds it.
    pub fn try_guard(&mut self) -> io::Result<Option<RwLockWriteGuard<'_, File>>> {
        match self.lock.try_write() {
            Ok(guard) => {
                debug!(path = %self.path.display(), "acquired cycle lock");
                Ok(Some(guard))
            }
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(err) => Err(err),
        }
    }
}
