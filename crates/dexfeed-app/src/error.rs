//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] dexfeed_ws::WsError),

    #[error("Extraction error: {0}")]
    Extract(#[from] dexfeed_extract::ExtractError),

    #[error("Enrichment error: {0}")]
    Enrich(#[from] dexfeed_enrich::EnrichError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dexfeed_telemetry::TelemetryError),

    #[error("Web error: {0}")]
    Web(#[from] dexfeed_web::WebError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
