// Agbalumo Gate - Main Entry Point
//
// Runs the admission-controlled HTTP surface:
// - CLI interface
// - Configuration loading (TOML + environment)
// - Per-client rate limiting with background eviction

use agbalumo_gate::config::{Config, DEFAULT_CONFIG_FILE};
use agbalumo_gate::{logging, server};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, info};

/// Agbalumo Gate: per-client admission control
#[derive(Parser, Debug)]
#[command(name = "agbalumo-gate")]
#[command(author = "Agbalumo Contributors")]
#[command(version)]
#[command(about = "Per-client admission control for the Agbalumo directory server", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Command to run
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate the configuration and print the effective values
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let mut config = Config::load_from_path(&args.config)
        .with_context(|| format!("Failed to load configuration from {:?}", args.config))?;

    logging::init(&config.logging, args.verbose)?;

    // Loading runs before the subscriber exists, so report the source here
    if args.config.exists() {
        info!("Loaded configuration from {:?}", args.config);
    } else {
        debug!("Config file not found at {:?}, using defaults", args.config);
    }

    match args.command {
        Some(Commands::Serve { port }) => {
            if let Some(port) = port {
                config.server.port = port;
                config.validate()?;
            }
            info!("Agbalumo Gate v{} starting...", env!("CARGO_PKG_VERSION"));
            server::serve(&config).await?;
        }
        Some(Commands::CheckConfig) => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("Configuration OK\n\n{}", rendered);
        }
        None => {
            info!("No command specified. Use \"agbalumo-gate --help\" for usage.");
        }
    }

    Ok(())
}
