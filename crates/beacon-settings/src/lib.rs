//! # beacon-settings
//!
//! Layered configuration for the beacon client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`BeaconSettings::default()`])
//! 2. **User file** (`~/.beacon/settings.json`, deep-merged over defaults)
//! 3. **Environment variables** (`BEACON_*` overrides, highest priority)
//!
//! Command-line flags are applied by the binary on top of all three.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    read_settings_file, settings_path,
};
pub use types::{BeaconSettings, LoggingSettings, ReconnectSettings, StreamSettings};
