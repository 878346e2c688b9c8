//! HTTP client for per-identifier metadata lookups.

use crate::error::{EnrichError, EnrichResult};
use crate::report::{EnrichedEntry, NoDataRecord, TrendReport};
use dexfeed_core::CandidateList;
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default token lookup endpoint. The identifier is appended verbatim.
pub const DEFAULT_BASE_URL: &str = "https://api.dexscreener.com/latest/dex/tokens/";

/// Default timeout for lookup requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of lookups in flight.
const DEFAULT_CONCURRENCY: usize = 4;

/// Lookup response body. Only `pairs` matters.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    pairs: Option<Vec<Value>>,
}

/// Client for the token metadata endpoint.
pub struct EnrichClient {
    client: Client,
    base_url: String,
    concurrency: usize,
}

impl EnrichClient {
    /// Create a client with default timeout and concurrency.
    pub fn new(base_url: impl Into<String>) -> EnrichResult<Self> {
        Self::with_options(base_url, DEFAULT_TIMEOUT, DEFAULT_CONCURRENCY)
    }

    /// Create a client.
    ///
    /// # Arguments
    /// * `base_url` - Lookup endpoint prefix (e.g., "https://api.dexscreener.com/latest/dex/tokens/")
    /// * `timeout` - Per-request timeout
    /// * `concurrency` - Lookups in flight at once; zero is treated as one
    pub fn with_options(
        base_url: impl Into<String>,
        timeout: Duration,
        concurrency: usize,
    ) -> EnrichResult<Self> {
        let base_url = base_url.into();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(EnrichError::InvalidBaseUrl(base_url));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url,
            concurrency: concurrency.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Look up one identifier.
    ///
    /// Never fails: every failure becomes an inline entry.
    pub async fn lookup(&self, identifier: &str) -> EnrichedEntry {
        let url = format!("{}{}", self.base_url, identifier);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(identifier, error = %e, "Lookup request failed");
                return EnrichedEntry::Error(format!("Error making request: {e}"));
            }
        };

        let status = response.status();
        if status != StatusCode::OK {
            warn!(identifier, status = status.as_u16(), "Lookup returned non-200");
            return EnrichedEntry::Error(format!("Error: Status code {}", status.as_u16()));
        }

        let body: TokenResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(identifier, error = %e, "Failed to parse lookup response");
                return EnrichedEntry::Error(format!("Error parsing response: {e}"));
            }
        };

        match body.pairs.and_then(|pairs| pairs.into_iter().next()) {
            Some(pair) => {
                debug!(identifier, "Lookup returned pair data");
                EnrichedEntry::Pair(pair)
            }
            None => {
                debug!(identifier, "Lookup returned no pairs");
                EnrichedEntry::NoData(NoDataRecord::new(identifier))
            }
        }
    }

    /// Enrich every candidate.
    ///
    /// Duplicates are looked up once and keep their first position. Output
    /// order follows extraction order regardless of completion order.
    pub async fn enrich(&self, candidates: &CandidateList) -> TrendReport {
        let identifiers = unique_in_order(candidates.iter().map(|t| t.as_str()));
        info!(
            candidates = candidates.len(),
            unique = identifiers.len(),
            concurrency = self.concurrency,
            "Enriching identifiers"
        );

        // Owned items keep the stream's future `Send` for any borrow of `self`.
        let data: Vec<EnrichedEntry> = stream::iter(identifiers)
            .map(|identifier| async move { self.lookup(&identifier).await })
            .buffered(self.concurrency)
            .collect()
            .await;

        TrendReport::new(data)
    }
}

fn unique_in_order<'a>(identifiers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    identifiers
        .filter(|id| seen.insert(*id))
        .map(str::to_owned)
        .collect()
}
