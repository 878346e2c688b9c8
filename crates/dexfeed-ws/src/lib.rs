//! Resilient websocket acquisition of the trending pairs feed.
//!
//! Provides:
//! - Candidate endpoint derivation across API versions
//! - Fingerprint profiles and fresh handshake keys per attempt
//! - Session warmup to collect cookies before the handshake
//! - Dual-path frame capture (managed client with HTTP-upgrade fallback)
//! - Sequential reconnect orchestration, first capture wins

pub mod client;
pub mod endpoint;
pub mod error;
pub mod fingerprint;
pub mod heartbeat;
pub mod orchestrator;
pub mod session;

pub use client::{
    inspect_frame, ClientPath, FallbackClient, FrameReceiver, FrameVerdict, PrimaryClient,
    ReceiverConfig,
};
pub use endpoint::{candidate_endpoints, with_suffix};
pub use error::{WsError, WsResult};
pub use fingerprint::{ConnectionAttempt, FingerprintProfile, HandshakeKey, HeaderSet};
pub use heartbeat::HeartbeatMonitor;
pub use orchestrator::{
    AttemptOutcome, AttemptRecord, FeedCapture, FeedConfig, FeedOrchestrator,
    ReconnectOrchestrator, UNKNOWN_ERROR,
};
pub use session::{HttpWarmup, SessionWarmup, SkipWarmup, WarmSession};

use std::pin::Pin;
use std::sync::Once;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any connections are made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
