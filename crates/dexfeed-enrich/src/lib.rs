//! Metadata enrichment for extracted identifiers.
//!
//! Looks up each identifier against the token endpoint and assembles the
//! ordered `{"data": [...]}` report.

pub mod client;
pub mod error;
pub mod report;

pub use client::{EnrichClient, DEFAULT_BASE_URL};
pub use error::{EnrichError, EnrichResult};
pub use report::{EnrichedEntry, NoDataRecord, TrendReport, NO_DATA_MARKER, NO_TOKENS_ERROR};
