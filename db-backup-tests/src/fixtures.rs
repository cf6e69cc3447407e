//! Test fixtures and sample data
//!
//! Sample client tool output and ready-made configurations.

use db_backup::config::{Config, LoggingSettings, S3Config, ServerConfig};

/// Typical `psql --csv` listing: header row, system databases mixed in
/// with user databases, trailing newline.
pub fn psql_listing() -> &'static str {
    "datname\npostgres\ntemplate1\ntemplate0\norders\nusers\n"
}

/// `psql --csv` listing with only system databases.
pub fn psql_listing_system_only() -> &'static str {
    "datname\npostgres\ntemplate1\ntemplate0\n"
}

/// Typical `mysql --execute='SHOW DATABASES'` listing.
pub fn mysql_listing() -> &'static str {
    "Database\ninformation_schema\nshop\nmysql\nperformance_schema\nsys\n"
}

pub fn pg_server() -> ServerConfig {
    ServerConfig {
        host: "pg.internal".to_string(),
        port: 5432,
        user: "postgres".to_string(),
        password: Some("pg-secret".to_string()),
    }
}

pub fn mysql_server() -> ServerConfig {
    ServerConfig {
        host: "mysql.internal".to_string(),
        port: 3306,
        user: "root".to_string(),
        password: Some("mysql-secret".to_string()),
    }
}

pub fn s3_config() -> S3Config {
    S3Config {
        bucket: "test-bucket".to_string(),
        access_key: Some("AKIATEST".to_string()),
        secret_key: Some("test-secret".to_string()),
    }
}

fn base_config() -> Config {
    Config {
        schedule: "0 0 0 * * *".to_string(),
        timezone: chrono_tz::UTC,
        s3: Some(s3_config()),
        postgres: None,
        mysql: None,
        command_timeout_secs: None,
        logging: LoggingSettings {
            directory: None,
            level: "info".to_string(),
            max_files: 10,
        },
    }
}

/// Both server kinds active, S3 configured.
pub fn full_config() -> Config {
    Config {
        postgres: Some(pg_server()),
        mysql: Some(mysql_server()),
        ..base_config()
    }
}

/// Only PostgreSQL active.
pub fn pg_only_config() -> Config {
    Config {
        postgres: Some(pg_server()),
        ..base_config()
    }
}

/// Only MySQL active.
pub fn mysql_only_config() -> Config {
    Config {
        mysql: Some(mysql_server()),
        ..base_config()
    }
}

/// PostgreSQL active but no S3 destination.
pub fn pg_only_config_without_s3() -> Config {
    Config {
        s3: None,
        ..pg_only_config()
    }
}
