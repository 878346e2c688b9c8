//! Client fingerprint profiles and per-attempt handshake headers.
//!
//! The feed's anti-bot layer blocks individual client fingerprints, so each
//! attempt presents one profile from a fixed rotation together with a freshly
//! generated `Sec-WebSocket-Key`.

use crate::error::{WsError, WsResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use reqwest::Url;
use std::fmt;

/// Origin presented to the feed host.
pub const SITE_ORIGIN: &str = "https://dexscreener.com";

/// Bytes of entropy in a handshake key.
const HANDSHAKE_KEY_BYTES: usize = 16;

/// Header names kept for the managed client, which owns connection,
/// upgrade, key and encoding headers itself.
const REDUCED_HEADERS: [&str; 6] = [
    "Origin",
    "Referer",
    "User-Agent",
    "Pragma",
    "Cache-Control",
    "Accept-Language",
];

/// A named bundle of browser identity presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub accept_language: &'static str,
    pub sec_ch_ua: Option<&'static str>,
    pub sec_ch_ua_platform: Option<&'static str>,
}

impl FingerprintProfile {
    pub const CHROME_124: Self = Self {
        name: "chrome124",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
        sec_ch_ua: Some("\"Chromium\";v=\"124\", \"Google Chrome\";v=\"124\", \"Not-A.Brand\";v=\"99\""),
        sec_ch_ua_platform: Some("\"Windows\""),
    };

    pub const CHROME_120: Self = Self {
        name: "chrome120",
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
        sec_ch_ua: Some("\"Not_A Brand\";v=\"8\", \"Chromium\";v=\"120\", \"Google Chrome\";v=\"120\""),
        sec_ch_ua_platform: Some("\"Windows\""),
    };

    pub const SAFARI_17_0: Self = Self {
        name: "safari17_0",
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        accept_language: "en-US,en;q=0.9",
        sec_ch_ua: None,
        sec_ch_ua_platform: None,
    };

    /// Default rotation, tried in this order for every endpoint.
    pub const ROTATION: [Self; 3] = [Self::CHROME_124, Self::CHROME_120, Self::SAFARI_17_0];

    /// Look up a profile of the default rotation by name.
    pub fn by_name(name: &str) -> Option<Self> {
        Self::ROTATION.iter().copied().find(|p| p.name == name)
    }

    /// Resolve a list of profile names, rejecting unknown ones.
    pub fn resolve_all<S: AsRef<str>>(names: &[S]) -> WsResult<Vec<Self>> {
        names
            .iter()
            .map(|n| {
                Self::by_name(n.as_ref())
                    .ok_or_else(|| WsError::UnknownProfile(n.as_ref().to_string()))
            })
            .collect()
    }
}

impl fmt::Display for FingerprintProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Base64-encoded random `Sec-WebSocket-Key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandshakeKey(String);

impl HandshakeKey {
    /// Generate a fresh key from 16 bytes of OS entropy.
    pub fn generate() -> Self {
        let mut bytes = [0u8; HANDSHAKE_KEY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HandshakeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered header list. Names keep their canonical casing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(&'static str, String)>,
}

impl HeaderSet {
    pub fn push(&mut self, name: &'static str, value: impl Into<String>) {
        self.entries.push((name, value.into()));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.entries.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One (endpoint, profile) attempt. Built per loop iteration and dropped
/// once the attempt resolves.
#[derive(Debug, Clone)]
pub struct ConnectionAttempt {
    endpoint: String,
    profile: FingerprintProfile,
    key: HandshakeKey,
    headers: HeaderSet,
}

impl ConnectionAttempt {
    pub fn new(endpoint: impl Into<String>, profile: FingerprintProfile) -> WsResult<Self> {
        let endpoint = endpoint.into();
        let host = host_header(&endpoint)?;
        let key = HandshakeKey::generate();
        let headers = full_headers(&host, &profile, &key);
        Ok(Self {
            endpoint,
            profile,
            key,
            headers,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn profile(&self) -> &FingerprintProfile {
        &self.profile
    }

    pub fn key(&self) -> &HandshakeKey {
        &self.key
    }

    /// Complete handshake header set for the fallback client path.
    pub fn full_headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Subset for the managed client path.
    pub fn reduced_headers(&self) -> HeaderSet {
        let mut reduced = HeaderSet::default();
        for name in REDUCED_HEADERS {
            if let Some(value) = self.headers.get(name) {
                reduced.push(name, value);
            }
        }
        reduced
    }
}

fn host_header(endpoint: &str) -> WsResult<String> {
    let url = Url::parse(endpoint)
        .map_err(|e| WsError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
    let host = url
        .host_str()
        .ok_or_else(|| WsError::InvalidEndpoint(format!("{endpoint}: missing host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn full_headers(host: &str, profile: &FingerprintProfile, key: &HandshakeKey) -> HeaderSet {
    let mut headers = HeaderSet::default();
    headers.push("Host", host);
    headers.push("Connection", "Upgrade");
    headers.push("User-Agent", profile.user_agent);
    headers.push("Upgrade", "websocket");
    headers.push("Origin", SITE_ORIGIN);
    headers.push("Referer", format!("{SITE_ORIGIN}/"));
    headers.push("Pragma", "no-cache");
    headers.push("Cache-Control", "no-cache");
    headers.push("Accept-Language", profile.accept_language);
    if let Some(ua) = profile.sec_ch_ua {
        headers.push("sec-ch-ua", ua);
    }
    if let Some(platform) = profile.sec_ch_ua_platform {
        headers.push("sec-ch-ua-platform", platform);
    }
    headers.push("Sec-Fetch-Dest", "websocket");
    headers.push("Sec-Fetch-Mode", "websocket");
    headers.push("Sec-Fetch-Site", "same-site");
    headers.push("Sec-WebSocket-Version", "13");
    headers.push("Accept-Encoding", "gzip, deflate, br, zstd");
    headers.push("Sec-WebSocket-Key", key.as_str());
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const URL: &str = "wss://io.dexscreener.com/dex/screener/v5/pairs/h24/1";

    #[test]
    fn test_handshake_keys_never_repeat() {
        let keys: HashSet<_> = (0..10_000).map(|_| HandshakeKey::generate()).collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_handshake_key_is_16_bytes_base64() {
        let key = HandshakeKey::generate();
        let decoded = STANDARD.decode(key.as_str()).unwrap();
        assert_eq!(decoded.len(), 16);
        assert_eq!(key.as_str().len(), 24);
    }

    #[test]
    fn test_attempts_get_distinct_keys() {
        let a = ConnectionAttempt::new(URL, FingerprintProfile::CHROME_124).unwrap();
        let b = ConnectionAttempt::new(URL, FingerprintProfile::CHROME_124).unwrap();
        assert_ne!(a.key(), b.key());
        assert_eq!(a.full_headers().get("sec-websocket-key"), Some(a.key().as_str()));
    }

    #[test]
    fn test_full_headers_carry_profile_and_host() {
        let attempt = ConnectionAttempt::new(URL, FingerprintProfile::SAFARI_17_0).unwrap();
        let headers = attempt.full_headers();
        assert_eq!(headers.get("Host"), Some("io.dexscreener.com"));
        assert_eq!(
            headers.get("User-Agent"),
            Some(FingerprintProfile::SAFARI_17_0.user_agent)
        );
        assert_eq!(headers.get("Upgrade"), Some("websocket"));
        assert_eq!(headers.get("Sec-WebSocket-Version"), Some("13"));
        assert!(headers.get("sec-ch-ua").is_none());
    }

    #[test]
    fn test_host_header_keeps_port() {
        let attempt =
            ConnectionAttempt::new("ws://127.0.0.1:9001/feed", FingerprintProfile::CHROME_120)
                .unwrap();
        assert_eq!(attempt.full_headers().get("Host"), Some("127.0.0.1:9001"));
    }

    #[test]
    fn test_reduced_headers_subset() {
        let attempt = ConnectionAttempt::new(URL, FingerprintProfile::CHROME_124).unwrap();
        let reduced = attempt.reduced_headers();
        assert_eq!(reduced.len(), REDUCED_HEADERS.len());
        assert!(reduced.get("Sec-WebSocket-Key").is_none());
        assert!(reduced.get("Connection").is_none());
        assert!(reduced.get("Accept-Encoding").is_none());
        assert_eq!(reduced.get("Origin"), Some(SITE_ORIGIN));
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(matches!(
            ConnectionAttempt::new("not a url", FingerprintProfile::CHROME_124),
            Err(WsError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_rotation_order_and_lookup() {
        let names: Vec<_> = FingerprintProfile::ROTATION.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["chrome124", "chrome120", "safari17_0"]);
        assert_eq!(
            FingerprintProfile::by_name("chrome120"),
            Some(FingerprintProfile::CHROME_120)
        );
        assert!(FingerprintProfile::resolve_all(&["chrome124", "edge99"]).is_err());
    }
}
