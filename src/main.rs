use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chronometer::config::{Config, StorageBackend};

mod commands;

#[derive(Parser)]
#[command(
    name = "chronometer",
    version,
    about = "Pseudo-keyed elapsed-time counters served over a small REST API",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer server
    Serve {
        /// Bind host
        #[arg(long)]
        host: Option<String>,

        /// Bind port
        #[arg(short, long)]
        port: Option<u16>,

        /// Storage backend (memory, file, sqlite)
        #[arg(long)]
        storage: Option<StorageBackend>,

        /// JSON snapshot path for the file backend
        #[arg(long)]
        snapshot_path: Option<PathBuf>,

        /// Database path for the sqlite backend
        #[arg(long)]
        sqlite_path: Option<PathBuf>,

        /// Milliseconds between ticks
        #[arg(long)]
        tick_interval_ms: Option<u64>,

        /// Serve static files from this directory
        #[arg(long)]
        static_dir: Option<String>,

        /// Disable CORS headers
        #[arg(long, default_value = "false")]
        no_cors: bool,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }

    // Initialize tracing/logging
    setup_tracing(&config.logging.format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve {
            host,
            port,
            storage,
            snapshot_path,
            sqlite_path,
            tick_interval_ms,
            static_dir,
            no_cors,
        } => {
            commands::ServeParams {
                host,
                port,
                storage,
                snapshot_path,
                sqlite_path,
                tick_interval_ms,
                static_dir,
                no_cors,
            }
            .apply(&mut config)?;

            tracing::info!(
                bind = %config.server.bind_address,
                storage = %config.storage.backend,
                tick_ms = config.ticker.interval_ms,
                "Starting serve command"
            );
            commands::serve(config).await?;
        }

        Commands::Config => {
            let rendered = config.to_toml().context("Failed to render configuration")?;
            print!("{rendered}");
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("chronometer=debug,tower_http=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("chronometer={level},warn")))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
