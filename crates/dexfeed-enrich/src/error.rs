//! Enrichment error types.
//!
//! Per-identifier failures never surface here; they become inline entries
//! in the report.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type EnrichResult<T> = Result<T, EnrichError>;
