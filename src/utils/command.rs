//! Utilities for running external tools with captured output
//!
//! Non-zero exit is not an error at this layer: callers inspect the
//! returned status and build their own typed errors from the exit code
//! and captured stderr.

use anyhow::{Context, Result};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Run a command with environment overrides and an optional timeout.
///
/// Returns `Err` only when the child could not be spawned or the timeout
/// elapsed; a child that ran and exited non-zero is an `Ok` with a failing
/// status.
pub async fn run_command(
    program: &str,
    args: &[String],
    envs: &[(String, String)],
    timeout: Option<Duration>,
) -> Result<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    for (key, value) in envs {
        cmd.env(key, value);
    }

    debug!("running command: {} {}", program, args.join(" "));

    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, cmd.output())
            .await
            .map_err(|_| anyhow::anyhow!("{} timed out after {:?}", program, limit))?
            .with_context(|| format!("failed to execute {}", program))?,
        None => cmd
            .output()
            .await
            .with_context(|| format!("failed to execute {}", program))?,
    };

    if !output.status.success() {
        debug!(
            "command exited with {:?}: {} {}",
            output.status.code(),
            program,
            args.join(" ")
        );
    }

    Ok(output)
}
