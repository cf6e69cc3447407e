use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Database server family. Each kind is configured and backed up
/// independently; MySQL is processed before Postgres within a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    MySql,
    Postgres,
}

impl ServerKind {
    /// Backup processing order.
    pub const ALL: [ServerKind; 2] = [ServerKind::MySql, ServerKind::Postgres];

    /// Short tag used in remote object keys.
    pub fn tag(self) -> &'static str {
        match self {
            ServerKind::MySql => "mysql",
            ServerKind::Postgres => "pg",
        }
    }

    /// System/administrative databases that are never backed up.
    pub fn system_databases(self) -> &'static [&'static str] {
        match self {
            ServerKind::MySql => &["information_schema", "performance_schema", "mysql", "sys"],
            ServerKind::Postgres => &["postgres", "template0", "template1"],
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerKind::MySql => write!(f, "MySQL"),
            ServerKind::Postgres => write!(f, "PostgreSQL"),
        }
    }
}

/// Connection settings for one database server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
}

/// Upload destination. Present iff `S3_BUCKET` is configured; credentials
/// are handed to the storage CLI via its environment, never via argv.
#[derive(Debug, Clone, Serialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(skip_serializing)]
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize)]
pub struct LoggingSettings {
    /// When set, rotated log files are written here in addition to the
    /// console output.
    pub directory: Option<PathBuf>,
    pub level: String,
    pub max_files: u32,
}

/// Fully resolved runtime configuration, built from the environment.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Cron expression (5 fields, or 6 with a leading seconds field).
    pub schedule: String,
    /// IANA timezone the schedule is evaluated in.
    pub timezone: chrono_tz::Tz,
    pub s3: Option<S3Config>,
    pub postgres: Option<ServerConfig>,
    pub mysql: Option<ServerConfig>,
    /// Upper bound on a single external tool invocation, in seconds.
    /// Unset means an invocation may block indefinitely.
    pub command_timeout_secs: Option<u64>,
    pub logging: LoggingSettings,
}

impl Config {
    /// Server settings for a kind, if that kind is active.
    pub fn server(&self, kind: ServerKind) -> Option<&ServerConfig> {
        match kind {
            ServerKind::MySql => self.mysql.as_ref(),
            ServerKind::Postgres => self.postgres.as_ref(),
        }
    }

    /// Active kinds in backup order.
    pub fn active_kinds(&self) -> Vec<ServerKind> {
        ServerKind::ALL
            .into_iter()
            .filter(|kind| self.server(*kind).is_some())
            .collect()
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}
