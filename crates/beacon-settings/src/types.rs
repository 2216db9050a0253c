//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON file is enough: missing fields keep their compiled default.

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "stream": { "url": "http://localhost:3000", "reconnect": { "initialDelayMs": 500 } },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BeaconSettings {
    /// Event stream connection.
    pub stream: StreamSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl BeaconSettings {
    /// Reject values that cannot describe a working connection.
    pub fn validate(&self) -> Result<()> {
        let stream = &self.stream;
        if !(stream.url.starts_with("http://") || stream.url.starts_with("https://")) {
            return Err(SettingsError::InvalidValue(format!(
                "stream.url must be an http(s) URL, got {:?}",
                stream.url
            )));
        }
        if !stream.endpoint.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "stream.endpoint must start with '/', got {:?}",
                stream.endpoint
            )));
        }
        let reconnect = &stream.reconnect;
        if reconnect.initial_delay_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "stream.reconnect.initialDelayMs must be positive".into(),
            ));
        }
        if reconnect.max_delay_ms < reconnect.initial_delay_ms {
            return Err(SettingsError::InvalidValue(format!(
                "stream.reconnect.maxDelayMs ({}) is below initialDelayMs ({})",
                reconnect.max_delay_ms, reconnect.initial_delay_ms
            )));
        }
        if !(0.0..=1.0).contains(&reconnect.jitter_factor) {
            return Err(SettingsError::InvalidValue(format!(
                "stream.reconnect.jitterFactor must be within 0..=1, got {}",
                reconnect.jitter_factor
            )));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(SettingsError::InvalidValue(format!(
                "logging.format must be \"pretty\" or \"json\", got {:?}",
                self.logging.format
            )));
        }
        Ok(())
    }
}

/// Where the event stream lives and how to keep it alive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Server base URL.
    pub url: String,
    /// Stream path on the server.
    pub endpoint: String,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Reconnect after this many milliseconds without bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idle_timeout_ms: Option<u64>,
    /// Backoff between reconnects.
    pub reconnect: ReconnectSettings,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            endpoint: "/events".to_string(),
            connect_timeout_ms: 10_000,
            idle_timeout_ms: None,
            reconnect: ReconnectSettings::default(),
        }
    }
}

/// Reconnect backoff settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectSettings {
    /// First reconnect delay.
    pub initial_delay_ms: u64,
    /// Backoff ceiling.
    pub max_delay_ms: u64,
    /// Random spread as a fraction of the delay, `0.0..=1.0`.
    pub jitter_factor: f64,
    /// Give up after this many consecutive failures. Absent means never.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            max_delay_ms: 30_000,
            jitter_factor: 0.2,
            max_retries: None,
        }
    }
}

/// Log output settings. `RUST_LOG` still wins over `level`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level name, e.g. `info`.
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
