//! Prometheus metrics for the dexfeed pipeline.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a startup bug. These panics only occur
//! during static initialization.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

/// Websocket connection attempts.
/// Labels: path (primary/fallback/none), outcome (captured/no_data/failed)
pub static WS_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexfeed_ws_attempts_total",
        "Websocket connection attempts by client path and outcome",
        &["path", "outcome"]
    )
    .unwrap()
});

/// Orchestration runs.
/// Labels: result (captured/exhausted)
pub static CAPTURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexfeed_captures_total",
        "Feed capture runs by result",
        &["result"]
    )
    .unwrap()
});

/// Extracted identifiers.
/// Labels: kind (evm_address/pump_suffixed/bonk_suffixed/base58_address)
pub static TOKENS_EXTRACTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexfeed_tokens_extracted_total",
        "Identifiers extracted from captured payloads",
        &["kind"]
    )
    .unwrap()
});

/// Enrichment lookups.
/// Labels: result (pair/no_data/error)
pub static ENRICH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dexfeed_enrich_total",
        "Enrichment lookups by result",
        &["result"]
    )
    .unwrap()
});

/// End-to-end pipeline duration in milliseconds.
pub static PIPELINE_DURATION_MS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "dexfeed_pipeline_duration_ms",
        "End-to-end pipeline duration in milliseconds",
        vec![100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0, 60000.0, 120000.0]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record one websocket attempt.
    pub fn ws_attempt(path: &str, outcome: &str) {
        WS_ATTEMPTS_TOTAL.with_label_values(&[path, outcome]).inc();
    }

    /// Record an orchestration result.
    pub fn capture(result: &str) {
        CAPTURES_TOTAL.with_label_values(&[result]).inc();
    }

    /// Record an extracted identifier.
    pub fn token_extracted(kind: &str) {
        TOKENS_EXTRACTED_TOTAL.with_label_values(&[kind]).inc();
    }

    /// Record an enrichment lookup.
    pub fn enrich(result: &str) {
        ENRICH_TOTAL.with_label_values(&[result]).inc();
    }

    pub fn pipeline_duration(duration_ms: f64) {
        PIPELINE_DURATION_MS.observe(duration_ms);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
