//! Connection and reconnection settings for [`StreamConnector`](crate::StreamConnector).

use std::time::Duration;

/// Path of the event stream, relative to the base URL.
pub const DEFAULT_ENDPOINT: &str = "/events";

/// Reconnection backoff.
#[derive(Clone, Debug)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect.
    pub initial_delay: Duration,
    /// Upper bound before jitter.
    pub max_delay: Duration,
    /// Fraction of the delay added or removed at random.
    pub jitter_factor: f64,
    /// Consecutive failed attempts tolerated before giving up. `None` retries
    /// forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_factor: 0.2,
            max_retries: None,
        }
    }
}

impl ReconnectConfig {
    /// Delay before reconnect number `attempt` (zero based):
    /// `initial_delay * 2^attempt`, capped at `max_delay`, then jittered.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exp_delay =
            self.initial_delay.as_millis() as f64 * 2.0_f64.powi(attempt.min(31) as i32);
        let capped = exp_delay.min(self.max_delay.as_millis() as f64) as u64;

        let jitter_range = (capped as f64 * self.jitter_factor.clamp(0.0, 1.0)) as u64;
        let jitter = if jitter_range > 0 {
            rand::random::<u64>() % (jitter_range * 2 + 1)
        } else {
            0
        };

        Duration::from_millis(capped.saturating_sub(jitter_range) + jitter)
    }
}

/// Where to connect and how to behave on the wire.
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Scheme and authority, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Stream path joined onto `base_url`.
    pub endpoint: String,
    /// Limit on establishing the TCP/TLS connection.
    pub connect_timeout: Duration,
    /// Treat the stream as dropped after this long without bytes.
    pub idle_timeout: Option<Duration>,
    /// Backoff between connection attempts.
    pub reconnect: ReconnectConfig,
}

impl StreamConfig {
    /// Defaults for `base_url`: `/events`, 10s connect timeout, no idle
    /// timeout, default backoff.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            connect_timeout: Duration::from_secs(10),
            idle_timeout: None,
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Set the stream path.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Drop the stream after `idle_timeout` without bytes.
    #[must_use]
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = Some(idle_timeout);
        self
    }

    /// Replace the backoff settings.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }
}
