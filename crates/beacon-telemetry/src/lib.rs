//! # beacon-telemetry
//!
//! One-call `tracing` setup: an [`EnvFilter`] built from `RUST_LOG` (falling
//! back to the configured level and per-module overrides) and a `fmt` layer
//! writing to stderr, either human-readable or one JSON object per line.

#![deny(unsafe_code)]

use std::fmt::Write as _;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Log line format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::InvalidFormat(other.to_string())),
        }
    }
}

/// Telemetry setup failures.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Level name not recognised by `tracing`.
    #[error("unknown log level {0:?}")]
    InvalidLevel(String),
    /// Neither `pretty` nor `json`.
    #[error("unknown log format {0:?}")]
    InvalidFormat(String),
    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by `RUST_LOG`.
    pub log_level: Level,
    /// Per-module level overrides (e.g. `"beacon_stream"` => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Output format.
    pub format: LogFormat,
    /// Include span context in JSON lines.
    pub with_spans: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            format: LogFormat::Pretty,
            with_spans: true,
        }
    }
}

impl TelemetryConfig {
    /// Config from textual level and format names.
    pub fn from_names(level: &str, format: &str) -> Result<Self, TelemetryError> {
        let log_level = Level::from_str(level.trim())
            .map_err(|_| TelemetryError::InvalidLevel(level.to_string()))?;
        Ok(Self {
            log_level,
            format: format.parse()?,
            ..Self::default()
        })
    }

    /// Add a per-module level override.
    #[must_use]
    pub fn with_module_level(mut self, module: impl Into<String>, level: Level) -> Self {
        self.module_levels.push((module.into(), level));
        self
    }

    /// Filter directives used when `RUST_LOG` is unset.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            let _ = write!(filter, ",{}={}", module, level.to_string().to_lowercase());
        }
        filter
    }
}

/// Initialize the telemetry subsystem. Call once at startup.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(config.with_spans)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))
}
