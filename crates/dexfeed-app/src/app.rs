//! End-to-end trending pairs pipeline.
//!
//! One run: capture a qualifying frame (endpoint x profile orchestration),
//! extract identifiers from it, enrich each identifier, assemble the report.
//! Runs are serialized so concurrent HTTP requests never drive two
//! orchestrations at once.

use crate::config::AppConfig;
use crate::error::AppResult;
use dexfeed_core::CandidateList;
use dexfeed_enrich::{EnrichClient, TrendReport};
use dexfeed_extract::TokenExtractor;
use dexfeed_telemetry::Metrics;
use dexfeed_web::{BoxFuture, TrendSource, WebError, WebResult};
use dexfeed_ws::{FeedCapture, FeedOrchestrator};
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Feed capture, extraction and enrichment behind one call.
pub struct TrendPipeline {
    config: AppConfig,
    extractor: TokenExtractor,
    enricher: EnrichClient,
    run_lock: Mutex<()>,
}

impl TrendPipeline {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let extractor = TokenExtractor::new()?;
        let enricher = EnrichClient::with_options(
            config.enrich.base_url.clone(),
            config.enrich_timeout(),
            config.enrich.concurrency,
        )?;

        Ok(Self {
            config,
            extractor,
            enricher,
            run_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the pipeline with `suffix` appended to the base feed URL.
    pub async fn fetch(&self, suffix: &str) -> AppResult<TrendReport> {
        let _guard = self.run_lock.lock().await;
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline", %run_id);

        self.run(suffix).instrument(span).await
    }

    async fn run(&self, suffix: &str) -> AppResult<TrendReport> {
        let started = Instant::now();
        let capture = self.capture(suffix).await?;
        let candidates = self.extract(&capture);

        let report = if candidates.is_empty() {
            warn!(
                exhausted = capture.last_error().is_some(),
                "No identifiers extracted"
            );
            let connection_error = capture.last_error().map(|_| capture.synthetic_payload());
            TrendReport::no_tokens(connection_error.as_deref())
        } else {
            let report = self.enricher.enrich(&candidates).await;
            for entry in &report.data {
                Metrics::enrich(entry.label());
            }
            report
        };

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        Metrics::pipeline_duration(elapsed_ms);
        info!(
            identifiers = candidates.len(),
            entries = report.len(),
            elapsed_ms,
            "Pipeline run complete"
        );
        Ok(report)
    }

    /// Capture the first qualifying frame.
    pub async fn capture(&self, suffix: &str) -> AppResult<FeedCapture> {
        let feed_config = self.config.feed_config(suffix)?;
        info!(url = %feed_config.url, "Starting feed capture");

        let orchestrator = FeedOrchestrator::from_config(&feed_config);
        let capture = orchestrator.run().await;

        for attempt in capture.attempts() {
            let path = attempt.path.map_or("none", |p| p.as_str());
            Metrics::ws_attempt(path, attempt.outcome);
        }
        match &capture {
            FeedCapture::Captured { .. } => Metrics::capture("captured"),
            FeedCapture::Exhausted { .. } => Metrics::capture("exhausted"),
        }

        Ok(capture)
    }

    /// Identifiers from the captured payload, or from the synthetic
    /// connection-error text when capture was exhausted.
    fn extract(&self, capture: &FeedCapture) -> CandidateList {
        let candidates = match capture.payload() {
            Some(payload) => self.extractor.extract(payload),
            None => self.extractor.extract_text(&capture.synthetic_payload()),
        };
        for token in candidates.iter() {
            Metrics::token_extracted(token.kind.as_str());
        }
        candidates
    }

    /// Build a runtime, run the pipeline once and return the report.
    pub fn fetch_blocking(config: AppConfig, suffix: &str) -> AppResult<TrendReport> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        runtime.block_on(async {
            let pipeline = TrendPipeline::new(config)?;
            pipeline.fetch(suffix).await
        })
    }
}

impl TrendSource for TrendPipeline {
    fn fetch<'a>(&'a self, suffix: &'a str) -> BoxFuture<'a, WebResult<TrendReport>> {
        Box::pin(async move {
            TrendPipeline::fetch(self, suffix)
                .await
                .map_err(|e| WebError::Source(e.to_string()))
        })
    }
}
