//! Autostat CLI
//!
//! Operator entry point for schema migrations against a named environment.

mod commands;

use clap::{Parser, Subcommand};
use commands::{JobCommand, MigrateCommand, StatusCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "AUTOSTAT_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "AUTOSTAT_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply (up) or roll back (down) every migration unit
    Migrate(MigrateCommand),
    /// Show which migration units the ledger records as applied
    Status(StatusCommand),
    /// Run a migration from a JSON event, as a scheduled job does
    Job(JobCommand),
}

fn init_tracing(log_level: &str, log_format: &str) -> anyhow::Result<()> {
    // RUST_LOG takes full control when set
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e))?
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "autostat={level},\
             autostat_cli={level},\
             autostat_core={level},\
             autostat_database={level},\
             autostat_migrations={level},\
             autostat_records={level},\
             sea_orm_migration=warn,\
             sqlx=warn,\
             sea_orm=warn",
            level = log_level
        ))
    };

    let fmt_layer = match log_format {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Commands::Migrate(migrate_cmd) => migrate_cmd.execute(),
        Commands::Status(status_cmd) => status_cmd.execute(),
        Commands::Job(job_cmd) => job_cmd.execute(),
    }
}
