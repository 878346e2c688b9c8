//! Session warmup before the websocket handshake.
//!
//! The feed's anti-bot layer expects a browser that has already visited the
//! site, so each attempt first issues plain GETs against the site origin and
//! the feed host with the attempt's profile and keeps the cookies it gets.
//! Warmup failures never abort an attempt.
//!
//! The warmup client speaks HTTP/1.1 only so the fallback path can send its
//! upgrade request through the same client, connection pool and cookie jar.

use crate::fingerprint::{ConnectionAttempt, FingerprintProfile};
use crate::BoxFuture;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Acquires cookies and session state for an attempt.
pub trait SessionWarmup: Send + Sync {
    fn warm_up<'a>(&'a self, attempt: &'a ConnectionAttempt) -> BoxFuture<'a, WarmSession>;
}

/// Session state owned by a single attempt.
///
/// Released with [`WarmSession::close`] (or on drop) before the next
/// attempt starts.
#[derive(Debug, Default)]
pub struct WarmSession {
    client: Option<Client>,
    cookie_header: Option<String>,
    requests_ok: usize,
}

impl WarmSession {
    /// A session that carries no state.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Session holding a fixed cookie header, without an HTTP client.
    pub fn with_cookies(cookie_header: impl Into<String>) -> Self {
        Self {
            cookie_header: Some(cookie_header.into()),
            ..Self::default()
        }
    }

    /// `Cookie` header value collected during warmup.
    pub fn cookie_header(&self) -> Option<&str> {
        self.cookie_header.as_deref()
    }

    /// HTTP client that performed the warmup, if any.
    pub fn http_client(&self) -> Option<&Client> {
        self.client.as_ref()
    }

    /// Number of warmup requests that got a response.
    pub fn requests_ok(&self) -> usize {
        self.requests_ok
    }

    /// Release the session's HTTP client and connection pool.
    pub fn close(self) {
        debug!(
            had_client = self.client.is_some(),
            has_cookies = self.cookie_header.is_some(),
            "Closing warmup session"
        );
    }
}

/// Warmup over HTTP with a cookie jar.
#[derive(Debug, Clone)]
pub struct HttpWarmup {
    origin_url: String,
    feed_host_url: String,
    timeout: Duration,
}

impl HttpWarmup {
    pub fn new(
        origin_url: impl Into<String>,
        feed_host_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            origin_url: origin_url.into(),
            feed_host_url: feed_host_url.into(),
            timeout,
        }
    }

    fn build_client(
        &self,
        profile: &FingerprintProfile,
        jar: Arc<Jar>,
    ) -> Result<Client, reqwest::Error> {
        Client::builder()
            .default_headers(profile_headers(profile))
            .cookie_provider(jar)
            .http1_only()
            .timeout(self.timeout)
            .build()
    }
}

impl SessionWarmup for HttpWarmup {
    fn warm_up<'a>(&'a self, attempt: &'a ConnectionAttempt) -> BoxFuture<'a, WarmSession> {
        Box::pin(async move {
            let profile = attempt.profile();
            let jar = Arc::new(Jar::default());
            let client = match self.build_client(profile, jar.clone()) {
                Ok(client) => client,
                Err(e) => {
                    warn!(profile = %profile, error = %e, "Failed to build warmup client");
                    return WarmSession::empty();
                }
            };

            let mut requests_ok = 0;
            for url in [&self.origin_url, &self.feed_host_url] {
                match client.get(url.as_str()).send().await {
                    Ok(response) => {
                        requests_ok += 1;
                        debug!(url = %url, status = %response.status(), profile = %profile, "Warmup request done");
                    }
                    Err(e) => {
                        warn!(url = %url, profile = %profile, error = %e, "Warmup request failed");
                    }
                }
            }

            let cookie_header = Url::parse(&self.feed_host_url)
                .ok()
                .and_then(|url| jar.cookies(&url))
                .and_then(|value| value.to_str().ok().map(str::to_string));

            WarmSession {
                client: Some(client),
                cookie_header,
                requests_ok,
            }
        })
    }
}

/// Warmup that does nothing. Used when warmup is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipWarmup;

impl SessionWarmup for SkipWarmup {
    fn warm_up<'a>(&'a self, _attempt: &'a ConnectionAttempt) -> BoxFuture<'a, WarmSession> {
        Box::pin(async { WarmSession::empty() })
    }
}

/// Stateless HTTP/1.1 client for an upgrade when no warmup client exists.
pub(crate) fn handshake_client(profile: &FingerprintProfile) -> Result<Client, reqwest::Error> {
    Client::builder()
        .default_headers(profile_headers(profile))
        .http1_only()
        .build()
}

fn profile_headers(profile: &FingerprintProfile) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(profile.user_agent));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(profile.accept_language),
    );
    if let Some(ua) = profile.sec_ch_ua {
        headers.insert(
            HeaderName::from_static("sec-ch-ua"),
            HeaderValue::from_static(ua),
        );
    }
    if let Some(platform) = profile.sec_ch_ua_platform {
        headers.insert(
            HeaderName::from_static("sec-ch-ua-platform"),
            HeaderValue::from_static(platform),
        );
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_headers() {
        let headers = profile_headers(&FingerprintProfile::CHROME_124);
        assert_eq!(
            headers.get(USER_AGENT).unwrap(),
            FingerprintProfile::CHROME_124.user_agent
        );
        assert!(headers.contains_key("sec-ch-ua"));

        let safari = profile_headers(&FingerprintProfile::SAFARI_17_0);
        assert!(!safari.contains_key("sec-ch-ua"));
    }

    #[tokio::test]
    async fn test_unreachable_warmup_is_not_fatal() {
        let warmup = HttpWarmup::new(
            "http://127.0.0.1:1/",
            "http://127.0.0.1:1/",
            Duration::from_millis(500),
        );
        let attempt =
            ConnectionAttempt::new("ws://127.0.0.1:1/feed", FingerprintProfile::CHROME_120)
                .unwrap();

        let session = warmup.warm_up(&attempt).await;
        assert_eq!(session.requests_ok(), 0);
        assert!(session.cookie_header().is_none());
        assert!(session.http_client().is_some());
        session.close();
    }

    #[tokio::test]
    async fn test_skip_warmup_is_empty() {
        let attempt =
            ConnectionAttempt::new("ws://127.0.0.1:1/feed", FingerprintProfile::CHROME_120)
                .unwrap();
        let session = SkipWarmup.warm_up(&attempt).await;
        assert!(session.cookie_header().is_none());
        assert!(session.http_client().is_none());
    }
}
