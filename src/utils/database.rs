//! Database client subprocess wrappers: enumeration and dumps
//!
//! Both kinds follow the same shape: invoke the server's administrative
//! client in non-interactive, machine-readable mode, pass the password via
//! the client's environment variable, and translate a non-zero exit into a
//! typed error carrying the exit code and stderr.

use crate::config::{ServerConfig, ServerKind};
use crate::error::{BackupError, Result};
use crate::utils::executor::CommandExecutor;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

fn password_envs(kind: ServerKind, server: &ServerConfig) -> Vec<(String, String)> {
    let var = match kind {
        ServerKind::Postgres => "PGPASSWORD",
        ServerKind::MySql => "MYSQL_PWD",
    };
    server
        .password
        .iter()
        .map(|password| (var.to_string(), password.clone()))
        .collect()
}

/// List the user databases on a server, system databases excluded.
pub async fn list_databases(
    executor: &dyn CommandExecutor,
    kind: ServerKind,
    server: &ServerConfig,
    timeout: Option<Duration>,
) -> Result<Vec<String>> {
    let (program, args) = match kind {
        ServerKind::Postgres => (
            "psql",
            vec![
                format!("--host={}", server.host),
                format!("--port={}", server.port),
                format!("--username={}", server.user),
                "--csv".to_string(),
                "--command=SELECT datname FROM pg_database;".to_string(),
            ],
        ),
        ServerKind::MySql => (
            "mysql",
            vec![
                format!("--host={}", server.host),
                format!("--port={}", server.port),
                format!("--user={}", server.user),
                "--execute=SHOW DATABASES".to_string(),
            ],
        ),
    };

    let output = executor
        .run(program, &args, &password_envs(kind, server), timeout)
        .await
        .map_err(|e| BackupError::Enumeration {
            kind,
            code: None,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(BackupError::Enumeration {
            kind,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(parse_listing(
        &String::from_utf8_lossy(&output.stdout),
        kind.system_databases(),
    ))
}

/// Strip the header row and trailing footer row from line-oriented client
/// output, then drop the kind's system databases.
fn parse_listing(raw: &str, denylist: &[&str]) -> Vec<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    if lines.len() <= 2 {
        return Vec::new();
    }
    lines[1..lines.len() - 1]
        .iter()
        .filter(|line| !denylist.contains(line))
        .map(|line| line.to_string())
        .collect()
}

/// Dump one database to `dest` as plain SQL, overwriting any stale file.
///
/// On failure `dest` may be left partially written; callers must not trust
/// it.
pub async fn dump_database(
    executor: &dyn CommandExecutor,
    kind: ServerKind,
    server: &ServerConfig,
    database: &str,
    dest: &Path,
    timeout: Option<Duration>,
) -> Result<()> {
    if dest.exists() {
        debug!("removing stale dump at {:?}", dest);
        std::fs::remove_file(dest)?;
    }

    let (program, args) = match kind {
        ServerKind::Postgres => (
            "pg_dump",
            vec![
                "--no-owner".to_string(),
                "--column-inserts".to_string(),
                format!("--host={}", server.host),
                format!("--port={}", server.port),
                format!("--file={}", dest.display()),
                format!("--username={}", server.user),
                database.to_string(),
            ],
        ),
        ServerKind::MySql => (
            "mysqldump",
            vec![
                format!("--host={}", server.host),
                format!("--port={}", server.port),
                format!("--user={}", server.user),
                format!("--result-file={}", dest.display()),
                database.to_string(),
            ],
        ),
    };

    let output = executor
        .run(program, &args, &password_envs(kind, server), timeout)
        .await
        .map_err(|e| BackupError::Dump {
            kind,
            database: database.to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(BackupError::Dump {
            kind,
            database: database.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}
