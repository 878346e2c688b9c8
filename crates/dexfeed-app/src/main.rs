//! dexfeed - trending pairs feed capture and enrichment.
//!
//! `serve` (default) runs the HTTP front end; `fetch` runs the pipeline
//! once and prints the JSON report.

use anyhow::Result;
use clap::{Parser, Subcommand};
use dexfeed_app::{AppConfig, TrendPipeline};
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Trending pairs feed capture and enrichment
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DEXFEED_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Run the pipeline once and print the report
    Fetch {
        /// Ranking query suffix appended to the feed URL
        #[arg(long, default_value = "")]
        suffix: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must run before any TLS connection is made.
    dexfeed_ws::init_crypto();

    let args = Args::parse();

    dexfeed_telemetry::init_logging()?;

    info!("Starting dexfeed v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > DEXFEED_CONFIG env var > default. Only the default may be missing.
    let (config_path, required) = match args
        .config
        .or_else(|| std::env::var("DEXFEED_CONFIG").ok())
    {
        Some(path) => (path, true),
        None => (DEFAULT_CONFIG_PATH.to_string(), false),
    };

    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::load(&config_path, required)?;
    info!(feed_url = %config.feed.url, profiles = ?config.feed.profiles, "Configuration loaded");

    let server_config = config.server.clone();
    let pipeline = Arc::new(TrendPipeline::new(config)?);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            dexfeed_web::run_server(pipeline, server_config).await?;
        }
        Command::Fetch { suffix } => {
            let report = pipeline.fetch(&suffix).await?;
            println!("{}", report.to_pretty_json(2)?);
        }
    }

    Ok(())
}
