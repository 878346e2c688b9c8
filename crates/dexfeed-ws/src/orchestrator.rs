//! Reconnect orchestration across endpoints and fingerprint profiles.
//!
//! Walks the (endpoint x profile) space strictly in order, one attempt at a
//! time. Each attempt warms up a session, tries the primary client and, only
//! if that fails outright, the fallback client. The first qualifying frame
//! ends the run.

use crate::client::{ClientPath, FallbackClient, FrameReceiver, PrimaryClient, ReceiverConfig};
use crate::endpoint::candidate_endpoints;
use crate::fingerprint::{ConnectionAttempt, FingerprintProfile};
use crate::session::{HttpWarmup, SessionWarmup, SkipWarmup, WarmSession};
use dexfeed_core::{FeedPayload, Frame};
use std::time::Duration;
use tracing::{info, warn};

/// Error text reported when no attempt produced an error message.
pub const UNKNOWN_ERROR: &str = "Unknown websocket error";

/// Feed acquisition configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Base websocket URL (suffix already applied).
    pub url: String,
    /// Site origin visited during warmup.
    pub origin_url: String,
    /// Feed host visited during warmup.
    pub feed_host_url: String,
    /// Bound on each warmup request.
    pub warmup_timeout: Duration,
    /// Whether to warm up sessions at all.
    pub warmup_enabled: bool,
    /// Profiles tried for every endpoint, in order.
    pub profiles: Vec<FingerprintProfile>,
    /// Per-connection limits shared by both client paths.
    pub receiver: ReceiverConfig,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            origin_url: "https://dexscreener.com/".to_string(),
            feed_host_url: "https://io.dexscreener.com/".to_string(),
            warmup_timeout: Duration::from_secs(10),
            warmup_enabled: true,
            profiles: FingerprintProfile::ROTATION.to_vec(),
            receiver: ReceiverConfig::default(),
        }
    }
}

/// Terminal outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Captured { frame: Frame, path: ClientPath },
    NoData { path: ClientPath },
    Failed { error: String },
}

impl AttemptOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AttemptOutcome::Captured { .. } => "captured",
            AttemptOutcome::NoData { .. } => "no_data",
            AttemptOutcome::Failed { .. } => "failed",
        }
    }
}

/// Record of a finished attempt, kept for diagnostics and metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub endpoint: String,
    pub profile: &'static str,
    /// Client path that produced the outcome (`None` if no client ran).
    pub path: Option<ClientPath>,
    /// Whether the primary client failed before the outcome was reached.
    pub primary_failed: bool,
    pub outcome: &'static str,
}

/// Result of a full orchestration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCapture {
    Captured {
        payload: FeedPayload,
        endpoint: String,
        profile: &'static str,
        path: ClientPath,
        attempts: Vec<AttemptRecord>,
    },
    Exhausted {
        last_error: String,
        attempts: Vec<AttemptRecord>,
    },
}

impl FeedCapture {
    pub fn payload(&self) -> Option<&FeedPayload> {
        match self {
            FeedCapture::Captured { payload, .. } => Some(payload),
            FeedCapture::Exhausted { .. } => None,
        }
    }

    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            FeedCapture::Captured { attempts, .. } | FeedCapture::Exhausted { attempts, .. } => {
                attempts
            }
        }
    }

    pub fn last_error(&self) -> Option<&str> {
        match self {
            FeedCapture::Captured { .. } => None,
            FeedCapture::Exhausted { last_error, .. } => Some(last_error),
        }
    }

    /// Payload text, or the synthetic failure text for an exhausted run.
    pub fn synthetic_payload(&self) -> String {
        match self {
            FeedCapture::Captured { payload, .. } => payload.text().into_owned(),
            FeedCapture::Exhausted { last_error, .. } => format!("Connection error: {last_error}"),
        }
    }
}

/// Drives warmup and the dual-path receiver over the candidate space.
pub struct ReconnectOrchestrator<W, P, F> {
    endpoints: Vec<String>,
    profiles: Vec<FingerprintProfile>,
    warmup: W,
    primary: P,
    fallback: F,
}

/// Orchestrator over the real network clients.
pub type FeedOrchestrator =
    ReconnectOrchestrator<Box<dyn SessionWarmup>, PrimaryClient, FallbackClient>;

impl FeedOrchestrator {
    /// Build the network orchestrator from configuration.
    pub fn from_config(config: &FeedConfig) -> Self {
        let warmup: Box<dyn SessionWarmup> = if config.warmup_enabled {
            Box::new(HttpWarmup::new(
                config.origin_url.clone(),
                config.feed_host_url.clone(),
                config.warmup_timeout,
            ))
        } else {
            Box::new(SkipWarmup)
        };

        ReconnectOrchestrator::new(
            candidate_endpoints(&config.url),
            config.profiles.clone(),
            warmup,
            PrimaryClient::new(config.receiver.clone()),
            FallbackClient::new(config.receiver.clone()),
        )
    }
}

impl SessionWarmup for Box<dyn SessionWarmup> {
    fn warm_up<'a>(
        &'a self,
        attempt: &'a ConnectionAttempt,
    ) -> crate::BoxFuture<'a, WarmSession> {
        (**self).warm_up(attempt)
    }
}

impl<W, P, F> ReconnectOrchestrator<W, P, F>
where
    W: SessionWarmup,
    P: FrameReceiver,
    F: FrameReceiver,
{
    pub fn new(
        endpoints: Vec<String>,
        profiles: Vec<FingerprintProfile>,
        warmup: W,
        primary: P,
        fallback: F,
    ) -> Self {
        Self {
            endpoints,
            profiles,
            warmup,
            primary,
            fallback,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Size of the candidate space.
    pub fn max_attempts(&self) -> usize {
        self.endpoints.len() * self.profiles.len()
    }

    /// Run attempts until the first capture or until the space is exhausted.
    pub async fn run(&self) -> FeedCapture {
        let mut last_error = UNKNOWN_ERROR.to_string();
        let mut attempts = Vec::with_capacity(self.max_attempts());

        for endpoint in &self.endpoints {
            for profile in &self.profiles {
                let attempt = match ConnectionAttempt::new(endpoint.as_str(), *profile) {
                    Ok(attempt) => attempt,
                    Err(e) => {
                        warn!(url = %endpoint, profile = %profile, error = %e, "Invalid attempt");
                        last_error = e.to_string();
                        attempts.push(AttemptRecord {
                            endpoint: endpoint.clone(),
                            profile: profile.name,
                            path: None,
                            primary_failed: false,
                            outcome: "failed",
                        });
                        continue;
                    }
                };

                let session = self.warmup.warm_up(&attempt).await;
                let (outcome, primary_failed) = self.run_attempt(&attempt, &session).await;
                session.close();

                let path = match &outcome {
                    AttemptOutcome::Captured { path, .. } | AttemptOutcome::NoData { path } => {
                        Some(*path)
                    }
                    AttemptOutcome::Failed { .. } => Some(ClientPath::Fallback),
                };
                attempts.push(AttemptRecord {
                    endpoint: endpoint.clone(),
                    profile: profile.name,
                    path,
                    primary_failed,
                    outcome: outcome.label(),
                });

                match outcome {
                    AttemptOutcome::Captured { frame, path } => {
                        info!(
                            url = %endpoint,
                            profile = %profile,
                            path = %path,
                            attempts = attempts.len(),
                            "Captured qualifying frame"
                        );
                        return FeedCapture::Captured {
                            payload: FeedPayload::new(frame),
                            endpoint: endpoint.clone(),
                            profile: profile.name,
                            path,
                            attempts,
                        };
                    }
                    AttemptOutcome::NoData { path } => {
                        info!(url = %endpoint, profile = %profile, path = %path, "No data received");
                    }
                    AttemptOutcome::Failed { error } => {
                        warn!(url = %endpoint, profile = %profile, error = %error, "Connection attempt failed");
                        last_error = error;
                    }
                }
            }
        }

        warn!(attempts = attempts.len(), last_error = %last_error, "All connection attempts exhausted");
        FeedCapture::Exhausted {
            last_error,
            attempts,
        }
    }

    /// One attempt: primary first, fallback only if the primary errored.
    async fn run_attempt(
        &self,
        attempt: &ConnectionAttempt,
        session: &WarmSession,
    ) -> (AttemptOutcome, bool) {
        match self.primary.receive(attempt, session).await {
            Ok(Some(frame)) => {
                return (
                    AttemptOutcome::Captured {
                        frame,
                        path: self.primary.path(),
                    },
                    false,
                )
            }
            Ok(None) => {
                return (
                    AttemptOutcome::NoData {
                        path: self.primary.path(),
                    },
                    false,
                )
            }
            Err(e) => {
                warn!(
                    url = %attempt.endpoint(),
                    profile = %attempt.profile(),
                    error = %e,
                    "Primary client failed, trying fallback"
                );
            }
        }

        let outcome = match self.fallback.receive(attempt, session).await {
            Ok(Some(frame)) => AttemptOutcome::Captured {
                frame,
                path: self.fallback.path(),
            },
            Ok(None) => AttemptOutcome::NoData {
                path: self.fallback.path(),
            },
            Err(e) => AttemptOutcome::Failed {
                error: e.to_string(),
            },
        };
        (outcome, true)
    }
}
