//! Web front end error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebError {
    #[error("Invalid bind address: {0}")]
    InvalidBind(String),

    /// The pipeline behind a route failed. Carries the display text shown
    /// to the client.
    #[error("{0}")]
    Source(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WebResult<T> = Result<T, WebError>;
