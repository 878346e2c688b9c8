//! Enrichment result shapes.

use crate::error::EnrichResult;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

/// Marker carried by the stand-in record for identifiers without pairs.
pub const NO_DATA_MARKER: &str = "No data Retrieved";

/// Report error when nothing could be extracted.
pub const NO_TOKENS_ERROR: &str =
    "No token addresses extracted. WebSocket may be blocked (403) or returned no pairs.";

/// Stand-in for an identifier whose lookup returned no pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoDataRecord {
    #[serde(rename = "pairAddress")]
    pub pair_address: String,
    #[serde(rename = "Error")]
    pub error: String,
}

impl NoDataRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            pair_address: identifier.into(),
            error: NO_DATA_MARKER.to_string(),
        }
    }
}

/// One identifier's slot in the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnrichedEntry {
    /// First pair object returned by the lookup, verbatim.
    Pair(Value),
    NoData(NoDataRecord),
    /// Inline error text (`"Error: Status code 429"` and friends).
    Error(String),
}

impl EnrichedEntry {
    /// Label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            EnrichedEntry::Pair(_) => "pair",
            EnrichedEntry::NoData(_) => "no_data",
            EnrichedEntry::Error(_) => "error",
        }
    }
}

/// `{"data": [...]}` with an optional top-level `error`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TrendReport {
    pub data: Vec<EnrichedEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrendReport {
    pub fn new(data: Vec<EnrichedEntry>) -> Self {
        Self { data, error: None }
    }

    /// Report for a run that extracted nothing.
    ///
    /// `connection_error` is the exhaustion message when capture failed
    /// outright; it is appended to the fixed explanation.
    pub fn no_tokens(connection_error: Option<&str>) -> Self {
        let error = match connection_error {
            Some(detail) => format!("{NO_TOKENS_ERROR} {detail}"),
            None => NO_TOKENS_ERROR.to_string(),
        };
        Self::failure(error)
    }

    /// Empty report carrying an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            data: Vec::new(),
            error: Some(error.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pretty JSON with the given indent width.
    pub fn to_pretty_json(&self, indent: usize) -> EnrichResult<String> {
        let indent = " ".repeat(indent);
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.serialize(&mut serializer)?;
        // serde_json only writes valid UTF-8.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
