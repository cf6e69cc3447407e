//! Error taxonomy for the backup pipeline
//!
//! Each external tool failure maps to the pipeline step it broke, carrying
//! the tool's exit code (absent when it was killed by a signal or never
//! spawned) and its captured stderr.

use crate::config::ServerKind;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackupError>;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to enumerate {kind} databases (exit code {code:?}): {stderr}")]
    Enumeration {
        kind: ServerKind,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to dump {kind} database '{database}' (exit code {code:?}): {stderr}")]
    Dump {
        kind: ServerKind,
        database: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to compress {path:?} (exit code {code:?}): {stderr}")]
    Compression {
        path: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to upload {path:?} as '{key}' (exit code {code:?}): {stderr}")]
    Upload {
        path: PathBuf,
        key: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failing_step() {
        let err = BackupError::Dump {
            kind: ServerKind::Postgres,
            database: "orders".to_string(),
            code: Some(1),
            stderr: "connection refused".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("orders"));
        assert!(msg.contains("PostgreSQL"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BackupError = io.into();
        assert!(matches!(err, BackupError::Io(_)));
    }
}
