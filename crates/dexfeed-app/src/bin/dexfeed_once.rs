//! One-shot pipeline run without an async entry point.
//!
//! Usage: `dexfeed-once [SUFFIX]`. Reads `DEXFEED_CONFIG` (default
//! `config/default.toml`) and prints the JSON report.

use anyhow::Result;
use dexfeed_app::{AppConfig, TrendPipeline};

fn main() -> Result<()> {
    dexfeed_ws::init_crypto();
    dexfeed_telemetry::init_logging()?;

    let suffix = std::env::args().nth(1).unwrap_or_default();
    let config = match std::env::var("DEXFEED_CONFIG") {
        Ok(path) => AppConfig::load(&path, true)?,
        Err(_) => AppConfig::load("config/default.toml", false)?,
    };

    let report = TrendPipeline::fetch_blocking(config, &suffix)?;
    println!("{}", report.to_pretty_json(2)?);
    Ok(())
}
