//! dexfeed-web - HTTP front end for the trending pairs pipeline.
//!
//! ```text
//! GET /                         → static form for the ranking suffix
//! GET /dex?generated_text=...   → pipeline result, pretty JSON in an HTML page
//! GET /api/trends?generated_text=... → pipeline result as JSON
//! GET /health                   → "ok"
//! GET /metrics                  → Prometheus text format
//! ```
//!
//! The pipeline itself sits behind [`TrendSource`], so the router can be
//! driven by any implementation.
//!
//! # Usage
//!
//! ```ignore
//! use dexfeed_web::{run_server, ServerConfig};
//!
//! let source = Arc::new(pipeline);
//! run_server(source, ServerConfig::default()).await?;
//! ```

mod config;
mod error;
mod server;

pub use config::ServerConfig;
pub use error::{WebError, WebResult};
pub use server::{create_router, escape_html, run_server, BoxFuture, TrendSource};
