//! Keepalive monitoring for feed connections.
//!
//! Tracks ping/pong timing and message activity so the read loop can send
//! protocol pings while idle and give up on a silent peer.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::time::Duration;
use tracing::debug;

/// Keepalive monitor for a single connection.
pub struct HeartbeatMonitor {
    /// How long the connection may idle before a ping is sent.
    interval: Duration,
    /// How long to wait for the pong.
    timeout: Duration,
    last_ping: RwLock<Option<DateTime<Utc>>>,
    last_message: RwLock<DateTime<Utc>>,
    waiting_for_pong: RwLock<bool>,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            last_ping: RwLock::new(None),
            last_message: RwLock::new(Utc::now()),
            waiting_for_pong: RwLock::new(false),
        }
    }

    /// Record that a ping was sent.
    pub fn record_ping(&self) {
        *self.last_ping.write() = Some(Utc::now());
        *self.waiting_for_pong.write() = true;
    }

    /// Record that a pong was received.
    pub fn record_pong(&self) {
        *self.waiting_for_pong.write() = false;
        if let Some(ping_time) = *self.last_ping.read() {
            let rtt_ms = (Utc::now() - ping_time).num_milliseconds();
            debug!(rtt_ms, "Received pong");
        }
    }

    /// Record that any frame was received.
    pub fn record_message(&self) {
        *self.last_message.write() = Utc::now();
    }

    /// Whether the outstanding ping has gone unanswered for too long.
    pub fn is_timed_out(&self) -> bool {
        if !*self.waiting_for_pong.read() {
            return false;
        }

        match *self.last_ping.read() {
            Some(ping_time) => elapsed(ping_time) > self.timeout,
            None => false,
        }
    }

    /// Whether the connection has idled long enough to warrant a ping.
    pub fn should_send_ping(&self) -> bool {
        if *self.waiting_for_pong.read() {
            return false;
        }
        elapsed(*self.last_message.read()) >= self.interval
    }

    /// Wait for the next check.
    pub async fn wait_for_check(&self) {
        tokio::time::sleep(self.check_period()).await;
    }

    fn check_period(&self) -> Duration {
        (self.interval.min(self.timeout) / 2).max(Duration::from_millis(10))
    }
}

fn elapsed(since: DateTime<Utc>) -> Duration {
    (Utc::now() - since).to_std().unwrap_or(Duration::ZERO)
}
