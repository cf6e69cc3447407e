use super::types::*;
use crate::utils::cron::CronSchedule;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid cron schedule '{schedule}': {source}")]
    Schedule {
        schedule: String,
        #[source]
        source: crate::utils::cron::CronParseError,
    },

    #[error("unknown timezone '{0}'")]
    Timezone(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Default schedule: daily at midnight (6-field form, leading seconds).
pub const DEFAULT_SCHEDULE: &str = "0 0 0 * * *";

impl Config {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Used by
    /// `from_env` and by tests that must not mutate the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let schedule = lookup("BACKUP_SCHEDULE").unwrap_or_else(|| DEFAULT_SCHEDULE.to_string());
        CronSchedule::parse(&schedule).map_err(|source| ConfigError::Schedule {
            schedule: schedule.clone(),
            source,
        })?;

        let timezone_name = lookup("TIMEZONE").unwrap_or_else(|| "UTC".to_string());
        let timezone = chrono_tz::Tz::from_str(&timezone_name)
            .map_err(|_| ConfigError::Timezone(timezone_name))?;

        let s3 = lookup("S3_BUCKET")
            .filter(|bucket| !bucket.is_empty())
            .map(|bucket| S3Config {
                bucket,
                access_key: lookup("S3_ACCESS_KEY"),
                secret_key: lookup("S3_SECRET_KEY"),
            });

        // A kind is active iff its host is set and non-empty.
        let postgres = lookup("PG_HOST")
            .filter(|host| !host.is_empty())
            .map(|host| {
                Ok(ServerConfig {
                    host,
                    port: parse_port(&lookup, "PG_PORT", 5432)?,
                    user: lookup("PG_USER").unwrap_or_else(|| "postgres".to_string()),
                    password: lookup("PG_PASSWORD"),
                })
            })
            .transpose()?;

        let mysql = lookup("MYSQL_HOST")
            .filter(|host| !host.is_empty())
            .map(|host| {
                Ok(ServerConfig {
                    host,
                    port: parse_port(&lookup, "MYSQL_PORT", 3306)?,
                    user: lookup("MYSQL_USER").unwrap_or_else(|| "root".to_string()),
                    password: lookup("MYSQL_PASSWORD"),
                })
            })
            .transpose()?;

        let command_timeout_secs = lookup("COMMAND_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                    key: "COMMAND_TIMEOUT_SECS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;

        let logging = LoggingSettings {
            directory: lookup("LOG_DIRECTORY")
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            max_files: lookup("LOG_MAX_FILES")
                .map(|raw| {
                    raw.parse::<u32>().map_err(|e| ConfigError::Invalid {
                        key: "LOG_MAX_FILES",
                        value: raw.clone(),
                        reason: e.to_string(),
                    })
                })
                .transpose()?
                .unwrap_or(10),
        };

        Ok(Config {
            schedule,
            timezone,
            s3,
            postgres,
            mysql,
            command_timeout_secs,
            logging,
        })
    }
}

fn parse_port(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u16,
) -> Result<u16> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
