//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BeaconSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `BEACON_*` environment variable overrides (highest priority)
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::BeaconSettings;

/// Resolve the path to the settings file (`~/.beacon/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".beacon").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<BeaconSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid value is an
/// error.
pub fn load_settings_from_path(path: &Path) -> Result<BeaconSettings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Defaults merged with the file at `path`, no env overrides.
pub fn read_settings_file(path: &Path) -> Result<BeaconSettings> {
    let defaults = serde_json::to_value(BeaconSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `BEACON_*` environment overrides.
///
/// Invalid values are logged and ignored, falling back to file/default.
pub fn apply_env_overrides(settings: &mut BeaconSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from any variable source.
pub fn apply_overrides(settings: &mut BeaconSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("BEACON_URL") {
        settings.stream.url = v;
    }
    if let Some(v) = read("BEACON_ENDPOINT") {
        settings.stream.endpoint = v;
    }
    if let Some(v) = read("BEACON_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("BEACON_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format.to_string(),
            None => warn!(key = "BEACON_LOG_FORMAT", value = %v, "invalid log format env var, ignoring"),
        }
    }
    if let Some(v) = read("BEACON_RETRY_MS") {
        match parse_u64_range(&v, 10, 600_000) {
            Some(ms) => {
                settings.stream.reconnect.initial_delay_ms = ms;
                if settings.stream.reconnect.max_delay_ms < ms {
                    settings.stream.reconnect.max_delay_ms = ms;
                }
            }
            None => warn!(key = "BEACON_RETRY_MS", value = %v, "invalid u64 env var, ignoring"),
        }
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Normalize a log format name (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<&'static str> {
    match val.trim().to_lowercase().as_str() {
        "pretty" | "text" => Some("pretty"),
        "json" => Some("json"),
        _ => None,
    }
}
