//! Prometheus metrics and structured logging for dexfeed.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for websocket attempts, captures, extraction and
//!   enrichment, plus a pipeline duration histogram

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
