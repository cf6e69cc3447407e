use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use db_backup::config::Config;
use db_backup::managers::{logging, scheduler::Scheduler};
use db_backup::utils::cron::CronSchedule;
use db_backup::BackupManager;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "db-backup")]
#[command(about = "Scheduled database backups to S3", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run resident: one backup cycle now, then on the cron schedule
    Serve,

    /// Run a single backup cycle and exit
    Run,

    /// List the user databases that would be backed up
    List,

    /// Validate the environment configuration and exit
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Validate => {
            logging::init_console_logging();
            handle_validate()
        }
        Commands::Serve => {
            let config = Config::from_env().context("invalid configuration")?;
            let _guard = logging::init_logging(&config.logging)?;
            warn_missing_tools(&config);
            let manager = BackupManager::new(config);
            Scheduler::new(manager)?.run().await
        }
        Commands::Run => {
            let config = Config::from_env().context("invalid configuration")?;
            let _guard = logging::init_logging(&config.logging)?;
            warn_missing_tools(&config);
            let manager = BackupManager::new(config);
            // Per-database failures are logged by the cycle and do not
            // affect the exit code.
            let summary = manager.run_cycle().await?;
            info!(
                succeeded = summary.succeeded,
                failed = summary.failed,
                "single cycle complete"
            );
            Ok(())
        }
        Commands::List => {
            logging::init_console_logging();
            let config = Config::from_env().context("invalid configuration")?;
            let manager = BackupManager::new(config);
            handle_list(&manager).await
        }
    }
}

fn handle_validate() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;

    // Secrets carry #[serde(skip_serializing)], so this stays safe to print.
    println!("{}", serde_json::to_string_pretty(&config)?);

    let schedule = CronSchedule::parse(&config.schedule)
        .with_context(|| format!("invalid schedule '{}'", config.schedule))?;
    match schedule.next_after(chrono::Utc::now(), config.timezone) {
        Some(next) => info!(
            next = %next.with_timezone(&config.timezone),
            "configuration is valid"
        ),
        None => warn!("schedule is valid but never fires"),
    }

    if config.active_kinds().is_empty() {
        warn!("no database servers are configured");
    }
    if config.s3.is_none() {
        warn!("S3_BUCKET is not set, uploads will fail");
    }

    Ok(())
}

async fn handle_list(manager: &BackupManager) -> Result<()> {
    let kinds = manager.config().active_kinds();
    if kinds.is_empty() {
        bail!("no database servers are configured");
    }

    for kind in kinds {
        let databases = manager
            .list_kind(kind)
            .await
            .with_context(|| format!("failed to list {kind} databases"))?;
        println!("{kind} ({} databases):", databases.len());
        for db in databases {
            println!("  {db}");
        }
    }

    Ok(())
}

/// Warn at startup about external tools that are not on PATH.
fn warn_missing_tools(config: &Config) {
    let mut tools: Vec<&str> = Vec::new();
    if config.postgres.is_some() {
        tools.extend(["psql", "pg_dump"]);
    }
    if config.mysql.is_some() {
        tools.extend(["mysql", "mysqldump"]);
    }
    if !tools.is_empty() {
        tools.push("gzip");
        tools.push("aws");
    }

    for tool in tools {
        if which::which(tool).is_err() {
            warn!(%tool, "required tool not found on PATH");
        }
    }
}
