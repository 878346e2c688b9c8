//! Application configuration.
//!
//! Loaded from a TOML file layered with `DEXFEED__`-prefixed environment
//! variables (`DEXFEED__FEED__URL`, `DEXFEED__SERVER__PORT`, ...).

use crate::error::{AppError, AppResult};
use config::{Config, Environment, File, FileFormat};
use dexfeed_core::PAIRS_MARKER;
use dexfeed_enrich::DEFAULT_BASE_URL;
use dexfeed_web::ServerConfig;
use dexfeed_ws::{with_suffix, FeedConfig, FingerprintProfile, ReceiverConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trending pairs feed ranked by the 6h trending score.
pub const DEFAULT_FEED_URL: &str = "wss://io.dexscreener.com/dex/screener/v5/pairs/h24/1?rankBy[key]=trendingScoreH6&rankBy[order]=desc";

const ENV_PREFIX: &str = "DEXFEED";
const ENV_SEPARATOR: &str = "__";

/// Feed acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedSection {
    /// Base websocket URL; the request suffix is appended verbatim.
    pub url: String,
    pub origin_url: String,
    pub feed_host_url: String,
    /// Substring a frame must contain to be captured.
    pub marker: String,
    pub open_timeout_ms: u64,
    pub receive_timeout_ms: u64,
    pub close_timeout_ms: u64,
    pub ping_interval_ms: u64,
    pub ping_timeout_ms: u64,
    pub max_frame_bytes: usize,
    pub warmup_timeout_ms: u64,
    pub warmup_enabled: bool,
    /// Fingerprint profile names, tried in order for every endpoint.
    pub profiles: Vec<String>,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            origin_url: "https://dexscreener.com/".to_string(),
            feed_host_url: "https://io.dexscreener.com/".to_string(),
            marker: PAIRS_MARKER.to_string(),
            open_timeout_ms: 20_000,
            receive_timeout_ms: 30_000,
            close_timeout_ms: 10_000,
            ping_interval_ms: 20_000,
            ping_timeout_ms: 20_000,
            max_frame_bytes: 8 * 1024 * 1024,
            warmup_timeout_ms: 10_000,
            warmup_enabled: true,
            profiles: FingerprintProfile::ROTATION
                .iter()
                .map(|p| p.name.to_string())
                .collect(),
        }
    }
}

/// Enrichment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichSection {
    pub base_url: String,
    pub timeout_ms: u64,
    /// Lookups in flight at once.
    pub concurrency: usize,
}

impl Default for EnrichSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            concurrency: 4,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default)]
    pub enrich: EnrichSection,
    #[serde(default)]
    pub server: ServerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file plus environment overrides.
    ///
    /// A missing file is an error only when `required` is set.
    pub fn load(path: &str, required: bool) -> AppResult<Self> {
        let settings = Config::builder()
            .add_source(File::new(path, FileFormat::Toml).required(required))
            .add_source(environment(None))
            .build()?;
        Self::finish(settings)
    }

    /// Parse configuration from TOML text, applying the given environment
    /// variables as overrides.
    pub fn from_toml_str(
        content: &str,
        env: Option<config::Map<String, String>>,
    ) -> AppResult<Self> {
        let settings = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(environment(env))
            .build()?;
        Self::finish(settings)
    }

    fn finish(settings: Config) -> AppResult<Self> {
        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot produce a working pipeline.
    pub fn validate(&self) -> AppResult<()> {
        let url = self.feed.url.as_str();
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(AppError::Config(format!(
                "feed.url must be a ws:// or wss:// URL, got {url:?}"
            )));
        }
        if self.feed.profiles.is_empty() {
            return Err(AppError::Config("feed.profiles must not be empty".to_string()));
        }
        FingerprintProfile::resolve_all(&self.feed.profiles)?;
        if self.feed.marker.is_empty() {
            return Err(AppError::Config("feed.marker must not be empty".to_string()));
        }
        if self.feed.max_frame_bytes == 0 {
            return Err(AppError::Config("feed.max_frame_bytes must be positive".to_string()));
        }
        if self.enrich.concurrency == 0 {
            return Err(AppError::Config("enrich.concurrency must be positive".to_string()));
        }
        self.server.socket_addr()?;
        Ok(())
    }

    /// Feed configuration for one run, with `suffix` appended to the base URL.
    pub fn feed_config(&self, suffix: &str) -> AppResult<FeedConfig> {
        let feed = &self.feed;
        Ok(FeedConfig {
            url: with_suffix(&feed.url, suffix),
            origin_url: feed.origin_url.clone(),
            feed_host_url: feed.feed_host_url.clone(),
            warmup_timeout: Duration::from_millis(feed.warmup_timeout_ms),
            warmup_enabled: feed.warmup_enabled,
            profiles: FingerprintProfile::resolve_all(&feed.profiles)?,
            receiver: ReceiverConfig {
                open_timeout: Duration::from_millis(feed.open_timeout_ms),
                receive_timeout: Duration::from_millis(feed.receive_timeout_ms),
                close_timeout: Duration::from_millis(feed.close_timeout_ms),
                ping_interval: Duration::from_millis(feed.ping_interval_ms),
                ping_timeout: Duration::from_millis(feed.ping_timeout_ms),
                max_frame_bytes: feed.max_frame_bytes,
                marker: feed.marker.clone(),
            },
        })
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_millis(self.enrich.timeout_ms)
    }
}

fn environment(source: Option<config::Map<String, String>>) -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("feed.profiles")
        .source(source)
}
