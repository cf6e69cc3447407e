//! Compression via the system gzip tool

use crate::error::{BackupError, Result};
use crate::utils::executor::CommandExecutor;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Path of the compressed sibling for `path`.
pub fn compressed_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.gz", path.display()))
}

/// Compress `path` in place, producing `path + ".gz"`.
///
/// gzip consumes the source file on success. A stale `.gz` from an earlier
/// run is removed first so the tool never prompts or appends.
pub async fn compress_file(
    executor: &dyn CommandExecutor,
    path: &Path,
    timeout: Option<Duration>,
) -> Result<PathBuf> {
    let gz = compressed_path(path);
    if gz.exists() {
        debug!("removing stale compressed artifact at {:?}", gz);
        std::fs::remove_file(&gz)?;
    }

    let args = vec![path.display().to_string()];
    let output = executor
        .run("gzip", &args, &[], timeout)
        .await
        .map_err(|e| BackupError::Compression {
            path: path.to_path_buf(),
            code: None,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(BackupError::Compression {
            path: path.to_path_buf(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(gz)
}
