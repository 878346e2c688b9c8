//! Extraction error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Token is not sanitized (non-printable character at byte {index})")]
    Unsanitized { index: usize },
}

pub type ExtractResult<T> = Result<T, ExtractError>;
