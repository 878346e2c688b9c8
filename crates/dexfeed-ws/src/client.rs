//! Websocket client paths used to capture the first qualifying frame.
//!
//! Two independent handshake stacks share one receive loop:
//! - [`PrimaryClient`]: managed handshake over tokio-tungstenite's own
//!   connector (native-tls). The library builds the upgrade request and only
//!   the reduced header subset is added. Enforces a frame ceiling and
//!   keepalive pings.
//! - [`FallbackClient`]: HTTP/1.1 upgrade sent through reqwest (rustls),
//!   reusing the warmup session's client and cookie jar. The request carries
//!   the attempt's full header set including its generated key, the accept
//!   hash is checked here, and the upgraded socket is wrapped as a websocket.
//!   Batched frames are collapsed to their first element before matching.

use crate::error::{WsError, WsResult};
use crate::fingerprint::{ConnectionAttempt, HeaderSet};
use crate::heartbeat::HeartbeatMonitor;
use crate::session::{handshake_client, WarmSession};
use crate::BoxFuture;
use dexfeed_core::{Frame, PAIRS_MARKER};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode, Url, Version};
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::handshake::derive_accept_key;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SEC_WEBSOCKET_ACCEPT};
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::{Role, WebSocketConfig};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async_tls_with_config, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

/// Which client path produced an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientPath {
    Primary,
    Fallback,
}

impl ClientPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientPath::Primary => "primary",
            ClientPath::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ClientPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives frames from one endpoint until a qualifying one arrives.
///
/// `Ok(Some(frame))` is a match, `Ok(None)` means the peer ended the stream
/// without one, `Err` is a transport or protocol failure.
pub trait FrameReceiver: Send + Sync {
    fn path(&self) -> ClientPath;

    fn receive<'a>(
        &'a self,
        attempt: &'a ConnectionAttempt,
        session: &'a WarmSession,
    ) -> BoxFuture<'a, WsResult<Option<Frame>>>;
}

/// Timeouts and limits for a single connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Bound on the TCP/TLS/websocket handshake.
    pub open_timeout: Duration,
    /// Bound on waiting for any single frame.
    pub receive_timeout: Duration,
    /// Bound on the closing handshake.
    pub close_timeout: Duration,
    /// Idle time before a keepalive ping is sent.
    pub ping_interval: Duration,
    /// Time allowed for the pong.
    pub ping_timeout: Duration,
    /// Ceiling for frame and message size.
    pub max_frame_bytes: usize,
    /// Substring that makes a frame qualifying.
    pub marker: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            open_timeout: Duration::from_secs(20),
            receive_timeout: Duration::from_secs(30),
            close_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(20),
            ping_timeout: Duration::from_secs(20),
            max_frame_bytes: 8 * 1024 * 1024,
            marker: PAIRS_MARKER.to_string(),
        }
    }
}

/// Result of inspecting one received frame.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameVerdict {
    /// Frame carries the marker.
    Qualifying(Frame),
    /// Frame is valid but irrelevant; keep reading.
    Skip,
    /// Empty frame; treated as end of stream.
    EndOfStream,
}

/// Decide what to do with a received frame.
///
/// With `collapse_sequences`, a batched frame is reduced to its first
/// element before the marker check.
pub fn inspect_frame(frame: Frame, marker: &str, collapse_sequences: bool) -> WsResult<FrameVerdict> {
    if frame.is_empty() {
        return Ok(FrameVerdict::EndOfStream);
    }

    let frame = if collapse_sequences {
        frame
            .into_first()
            .map_err(|e| WsError::Protocol(e.to_string()))?
    } else {
        frame
    };

    if frame.contains_marker(marker) {
        Ok(FrameVerdict::Qualifying(frame))
    } else {
        Ok(FrameVerdict::Skip)
    }
}

/// Managed-handshake client.
#[derive(Debug, Clone, Default)]
pub struct PrimaryClient {
    config: ReceiverConfig,
}

impl PrimaryClient {
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }

    fn ws_config(&self) -> WebSocketConfig {
        WebSocketConfig {
            max_message_size: Some(self.config.max_frame_bytes),
            max_frame_size: Some(self.config.max_frame_bytes),
            accept_unmasked_frames: false,
            ..Default::default()
        }
    }

    fn build_request(&self, attempt: &ConnectionAttempt) -> WsResult<Request> {
        let mut request = attempt.endpoint().into_client_request()?;
        apply_headers(request.headers_mut(), &attempt.reduced_headers())?;
        Ok(request)
    }
}

impl FrameReceiver for PrimaryClient {
    fn path(&self) -> ClientPath {
        ClientPath::Primary
    }

    fn receive<'a>(
        &'a self,
        attempt: &'a ConnectionAttempt,
        _session: &'a WarmSession,
    ) -> BoxFuture<'a, WsResult<Option<Frame>>> {
        Box::pin(async move {
            let request = self.build_request(attempt)?;
            let stream = open(request, Some(self.ws_config()), &self.config).await?;
            info!(
                url = %attempt.endpoint(),
                profile = %attempt.profile(),
                path = %self.path(),
                "WebSocket connected"
            );
            capture(stream, &self.config, false).await
        })
    }
}

/// Upgrade-over-HTTP client bound to the warmup session.
#[derive(Debug, Clone, Default)]
pub struct FallbackClient {
    config: ReceiverConfig,
}

impl FallbackClient {
    pub fn new(config: ReceiverConfig) -> Self {
        Self { config }
    }

    fn build_request(
        &self,
        client: &Client,
        attempt: &ConnectionAttempt,
        session: &WarmSession,
    ) -> WsResult<reqwest::Request> {
        let mut headers = HeaderMap::new();
        apply_headers(&mut headers, attempt.full_headers())?;
        if let Some(cookies) = session.cookie_header() {
            let value = HeaderValue::from_str(cookies).map_err(|e| WsError::InvalidHeader {
                name: "Cookie".to_string(),
                reason: e.to_string(),
            })?;
            headers.insert(COOKIE, value);
        }

        client
            .get(upgrade_url(attempt.endpoint())?)
            .version(Version::HTTP_11)
            .headers(headers)
            .build()
            .map_err(|e| WsError::InvalidEndpoint(format!("{}: {e}", attempt.endpoint())))
    }

    async fn handshake(
        &self,
        attempt: &ConnectionAttempt,
        session: &WarmSession,
    ) -> WsResult<WebSocketStream<reqwest::Upgraded>> {
        let owned;
        let client = match session.http_client() {
            Some(client) => client,
            None => {
                owned = handshake_client(attempt.profile()).map_err(|e| {
                    WsError::ConnectionFailed(format!("Failed to create HTTP client: {e}"))
                })?;
                &owned
            }
        };

        let request = self.build_request(client, attempt, session)?;
        let response = client
            .execute(request)
            .await
            .map_err(|e| WsError::ConnectionFailed(format!("Upgrade request failed: {e}")))?;
        verify_upgrade(response.status(), response.headers(), attempt)?;
        debug!(status = %response.status(), "Handshake complete");

        let upgraded = response
            .upgrade()
            .await
            .map_err(|e| WsError::ConnectionFailed(format!("Upgrade failed: {e}")))?;
        Ok(WebSocketStream::from_raw_socket(upgraded, Role::Client, None).await)
    }
}

impl FrameReceiver for FallbackClient {
    fn path(&self) -> ClientPath {
        ClientPath::Fallback
    }

    fn receive<'a>(
        &'a self,
        attempt: &'a ConnectionAttempt,
        session: &'a WarmSession,
    ) -> BoxFuture<'a, WsResult<Option<Frame>>> {
        Box::pin(async move {
            let stream = match timeout(self.config.open_timeout, self.handshake(attempt, session)).await
            {
                Ok(stream) => stream?,
                Err(_) => return Err(WsError::Timeout("websocket open")),
            };
            info!(
                url = %attempt.endpoint(),
                profile = %attempt.profile(),
                path = %self.path(),
                "WebSocket connected"
            );
            capture(stream, &self.config, true).await
        })
    }
}

/// Map a websocket URL onto the HTTP scheme the upgrade request is sent with.
fn upgrade_url(endpoint: &str) -> WsResult<Url> {
    let mut url =
        Url::parse(endpoint).map_err(|e| WsError::InvalidEndpoint(format!("{endpoint}: {e}")))?;
    let scheme = match url.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        other => {
            return Err(WsError::InvalidEndpoint(format!(
                "{endpoint}: unsupported scheme {other}"
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| WsError::InvalidEndpoint(format!("{endpoint}: cannot use {scheme}")))?;
    Ok(url)
}

/// The server must switch protocols and answer our key.
fn verify_upgrade(
    status: StatusCode,
    headers: &HeaderMap,
    attempt: &ConnectionAttempt,
) -> WsResult<()> {
    if status != StatusCode::SWITCHING_PROTOCOLS {
        return Err(WsError::ConnectionFailed(format!(
            "Handshake rejected: HTTP {}",
            status.as_u16()
        )));
    }
    let expected = derive_accept_key(attempt.key().as_str().as_bytes());
    match headers.get(SEC_WEBSOCKET_ACCEPT) {
        Some(value) if value.as_bytes() == expected.as_bytes() => Ok(()),
        Some(_) => Err(WsError::Protocol("Sec-WebSocket-Accept mismatch".to_string())),
        None => Err(WsError::Protocol("missing Sec-WebSocket-Accept".to_string())),
    }
}

fn apply_headers(target: &mut HeaderMap, headers: &HeaderSet) -> WsResult<()> {
    for (name, value) in headers.iter() {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| WsError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| WsError::InvalidHeader {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
        target.insert(header_name, header_value);
    }
    Ok(())
}

async fn open(
    request: Request,
    ws_config: Option<WebSocketConfig>,
    config: &ReceiverConfig,
) -> WsResult<WebSocketStream<MaybeTlsStream<TcpStream>>> {
    let connect = connect_async_tls_with_config(request, ws_config, true, None);
    match timeout(config.open_timeout, connect).await {
        Ok(Ok((stream, response))) => {
            debug!(status = %response.status(), "Handshake complete");
            Ok(stream)
        }
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(WsError::Timeout("websocket open")),
    }
}

/// Read until a qualifying frame, end of stream or failure, then close.
async fn capture<S>(
    stream: WebSocketStream<S>,
    config: &ReceiverConfig,
    collapse_sequences: bool,
) -> WsResult<Option<Frame>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = stream.split();
    let result = read_until_marker(&mut write, &mut read, config, collapse_sequences).await;

    match timeout(config.close_timeout, write.close()).await {
        Ok(Ok(())) => debug!("WebSocket closed"),
        Ok(Err(e)) => debug!(error = %e, "WebSocket close failed"),
        Err(_) => debug!("WebSocket close timed out"),
    }

    result
}

async fn read_until_marker<S>(
    write: &mut SplitSink<WebSocketStream<S>, Message>,
    read: &mut SplitStream<WebSocketStream<S>>,
    config: &ReceiverConfig,
    collapse_sequences: bool,
) -> WsResult<Option<Frame>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let heartbeat = HeartbeatMonitor::new(config.ping_interval, config.ping_timeout);
    // Control frames do not extend the wait for data.
    let mut deadline = Instant::now() + config.receive_timeout;

    loop {
        tokio::select! {
            msg = timeout_at(deadline, read.next()) => {
                let frame = match msg {
                    Err(_) => return Err(WsError::Timeout("next frame")),
                    Ok(None) => {
                        debug!("WebSocket stream ended");
                        return Ok(None);
                    }
                    Ok(Some(Err(e))) => return Err(e.into()),
                    Ok(Some(Ok(message))) => {
                        heartbeat.record_message();
                        match message {
                            Message::Text(text) => {
                                deadline = Instant::now() + config.receive_timeout;
                                Frame::Text(text)
                            }
                            Message::Binary(bytes) => {
                                deadline = Instant::now() + config.receive_timeout;
                                Frame::Binary(bytes)
                            }
                            Message::Ping(data) => {
                                write.send(Message::Pong(data)).await?;
                                continue;
                            }
                            Message::Pong(_) => {
                                heartbeat.record_pong();
                                continue;
                            }
                            Message::Close(frame) => {
                                let (code, reason) = frame
                                    .map(|f| (u16::from(f.code), f.reason.to_string()))
                                    .unwrap_or((1000, "Normal close".to_string()));
                                debug!(code, %reason, "WebSocket closed by server");
                                return Ok(None);
                            }
                            Message::Frame(_) => continue,
                        }
                    }
                };

                let size = frame.len();
                match inspect_frame(frame, &config.marker, collapse_sequences)? {
                    FrameVerdict::Qualifying(frame) => {
                        debug!(size, "Qualifying frame received");
                        return Ok(Some(frame));
                    }
                    FrameVerdict::Skip => debug!(size, "Skipping frame without marker"),
                    FrameVerdict::EndOfStream => {
                        warn!("Empty frame received, treating as end of stream");
                        return Ok(None);
                    }
                }
            }

            _ = heartbeat.wait_for_check() => {
                if heartbeat.is_timed_out() {
                    return Err(WsError::HeartbeatTimeout);
                }
                if heartbeat.should_send_ping() {
                    write.send(Message::Ping(Vec::new())).await?;
                    heartbeat.record_ping();
                    debug!("Sent keepalive ping");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::FingerprintProfile;

    fn attempt() -> ConnectionAttempt {
        ConnectionAttempt::new(
            "wss://io.dexscreener.com/dex/screener/v5/pairs/h24/1",
            FingerprintProfile::CHROME_124,
        )
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = ReceiverConfig::default();
        assert_eq!(config.open_timeout, Duration::from_secs(20));
        assert_eq!(config.max_frame_bytes, 8 * 1024 * 1024);
        assert_eq!(config.ping_interval, config.ping_timeout);
        assert_eq!(config.marker, "pairs");
    }

    #[test]
    fn test_inspect_frame_marker() {
        let verdict = inspect_frame(Frame::Text("{\"pairs\":[]}".into()), "pairs", false).unwrap();
        assert!(matches!(verdict, FrameVerdict::Qualifying(_)));

        let verdict = inspect_frame(Frame::Text("{\"type\":\"stats\"}".into()), "pairs", false).unwrap();
        assert_eq!(verdict, FrameVerdict::Skip);
    }

    #[test]
    fn test_inspect_empty_frame_ends_stream() {
        let verdict = inspect_frame(Frame::Binary(Vec::new()), "pairs", true).unwrap();
        assert_eq!(verdict, FrameVerdict::EndOfStream);
    }

    #[test]
    fn test_inspect_collapses_sequences() {
        let frame = Frame::Sequence(vec![
            Frame::Binary(b"pairs data".to_vec()),
            Frame::Text("trailer".into()),
        ]);
        let verdict = inspect_frame(frame, "pairs", true).unwrap();
        assert_eq!(verdict, FrameVerdict::Qualifying(Frame::Binary(b"pairs data".to_vec())));

        // Marker only in a later element does not qualify once collapsed.
        let frame = Frame::Sequence(vec![Frame::Text("head".into()), Frame::Text("pairs".into())]);
        assert_eq!(inspect_frame(frame, "pairs", true).unwrap(), FrameVerdict::Skip);
    }

    #[test]
    fn test_primary_request_uses_reduced_headers() {
        let client = PrimaryClient::default();
        let request = client.build_request(&attempt()).unwrap();
        let headers = request.headers();
        assert_eq!(headers.get("origin").unwrap(), "https://dexscreener.com");
        assert_eq!(
            headers.get("user-agent").unwrap(),
            FingerprintProfile::CHROME_124.user_agent
        );
        assert!(headers.get("accept-encoding").is_none());
        assert!(headers.get("sec-fetch-mode").is_none());
    }

    #[test]
    fn test_fallback_request_uses_full_headers_and_cookies() {
        let attempt = attempt();
        let session = WarmSession::with_cookies("__cf_bm=abc; cf_clearance=xyz");
        let client = FallbackClient::default();
        let request = client
            .build_request(&Client::new(), &attempt, &session)
            .unwrap();

        assert_eq!(
            request.url().as_str(),
            "https://io.dexscreener.com/dex/screener/v5/pairs/h24/1"
        );
        assert_eq!(request.version(), Version::HTTP_11);
        let headers = request.headers();
        assert_eq!(
            headers.get("sec-websocket-key").unwrap(),
            attempt.key().as_str()
        );
        assert_eq!(headers.get("upgrade").unwrap(), "websocket");
        assert_eq!(headers.get("host").unwrap(), "io.dexscreener.com");
        assert_eq!(headers.get("cookie").unwrap(), "__cf_bm=abc; cf_clearance=xyz");
        assert_eq!(headers.get("accept-encoding").unwrap(), "gzip, deflate, br, zstd");
    }

    #[test]
    fn test_upgrade_url_schemes() {
        assert_eq!(
            upgrade_url("ws://127.0.0.1:9000/feed?x=1").unwrap().as_str(),
            "http://127.0.0.1:9000/feed?x=1"
        );
        assert_eq!(upgrade_url("wss://io.dexscreener.com/a").unwrap().scheme(), "https");
        assert!(matches!(
            upgrade_url("ftp://io.dexscreener.com/a"),
            Err(WsError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_verify_upgrade_checks_accept_key() {
        let attempt = attempt();
        let mut headers = HeaderMap::new();
        headers.insert(
            SEC_WEBSOCKET_ACCEPT,
            HeaderValue::from_str(&derive_accept_key(attempt.key().as_str().as_bytes())).unwrap(),
        );
        assert!(verify_upgrade(StatusCode::SWITCHING_PROTOCOLS, &headers, &attempt).is_ok());

        assert!(matches!(
            verify_upgrade(StatusCode::FORBIDDEN, &headers, &attempt),
            Err(WsError::ConnectionFailed(msg)) if msg == "Handshake rejected: HTTP 403"
        ));

        headers.insert(SEC_WEBSOCKET_ACCEPT, HeaderValue::from_static("bogus"));
        assert!(matches!(
            verify_upgrade(StatusCode::SWITCHING_PROTOCOLS, &headers, &attempt),
            Err(WsError::Protocol(_))
        ));
        assert!(matches!(
            verify_upgrade(StatusCode::SWITCHING_PROTOCOLS, &HeaderMap::new(), &attempt),
            Err(WsError::Protocol(_))
        ));
    }
}
