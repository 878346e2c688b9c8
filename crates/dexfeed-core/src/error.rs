//! Error types for dexfeed-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Empty frame sequence")]
    EmptySequence,
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
