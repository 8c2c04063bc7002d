//! # Botica Server
//!
//! Process entry point. Reads the connection configuration, brings the database
//! up (connectivity check, then schema sync) and holds the client handle until
//! shutdown. Any startup failure is logged once and ends the process with
//! status 1.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use botica_common::config::ConnectionConfig;
use botica_db::{BootstrapError, BootstrapErrorKind, Schema, SyncOptions};
use clap::Parser;
use tracing_subscriber::EnvFilter;

const DEFAULT_SCHEMA: &str = "schema.toml";

#[derive(Debug, Parser)]
#[command(name = "botica", version, about = "Connects to the Botica database and synchronizes its schema")]
struct Cli {
    /// Declared schema (TOML). Defaults to ./schema.toml when present.
    #[arg(long, env = "BOTICA_SCHEMA")]
    schema: Option<PathBuf>,

    /// Keep live columns that are no longer declared instead of dropping them.
    #[arg(long)]
    keep_extra_columns: bool,

    /// Exit once the database is ready instead of holding the connection open.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env must be loaded before clap and the log filter read the environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize tracing (structured logging)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_target(true)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}: {e:#}", failure_prefix(&e));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    tracing::info!("Starting Botica v{}", env!("CARGO_PKG_VERSION"));

    let config = ConnectionConfig::load()?;
    let schema = load_schema(cli.schema.as_deref())?;
    let options = SyncOptions {
        drop_columns: !cli.keep_extra_columns,
    };

    let db = botica_db::initialize(&config, &schema, options).await?;
    tracing::info!("Database ready at {}", config.display_target());

    if cli.once {
        db.close().await;
        return Ok(());
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for the shutdown signal")?;
    tracing::info!("Shutting down");
    db.close().await;
    Ok(())
}

/// Lead-in for the fatal log line, chosen by what went wrong.
fn failure_prefix(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<BootstrapError>().map(BootstrapError::kind) {
        Some(BootstrapErrorKind::Connectivity) => "Unable to connect to the database",
        Some(BootstrapErrorKind::SchemaSync) => "Unable to synchronize the database schema",
        Some(BootstrapErrorKind::Configuration) | None => "Startup failed",
    }
}

fn load_schema(path: Option<&Path>) -> anyhow::Result<Schema> {
    let schema = match path {
        Some(path) => Schema::load(path)?,
        None if Path::new(DEFAULT_SCHEMA).exists() => Schema::load(DEFAULT_SCHEMA)?,
        None => {
            tracing::warn!("No schema declared; only the connection will be checked");
            Schema::new()
        }
    };
    tracing::info!("Loaded schema with {} table(s)", schema.tables.len());
    Ok(schema)
}
