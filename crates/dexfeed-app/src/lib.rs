//! Trending pairs pipeline.
//!
//! Wires the components together:
//! - Feed capture over websocket (endpoint x profile orchestration)
//! - Identifier extraction from the captured payload
//! - Per-identifier enrichment
//! - HTTP front end and CLI entry points

pub mod app;
pub mod config;
pub mod error;

pub use app::TrendPipeline;
pub use config::{AppConfig, EnrichSection, FeedSection};
pub use error::{AppError, AppResult};
