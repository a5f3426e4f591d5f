//! # tether-settings
//!
//! Tunables for the copilot backend, grouped by concern:
//!
//! - **server**: bind address, database path, shutdown budget
//! - **logging**: level and output format
//! - **stream**: tail poll interval, tail budget, retention of finished sessions
//! - **copilot**: decision wait/TTL, step and retry limits, watchdog, model endpoint
//! - **workflow**: block types the revert path can rebuild
//!
//! [`load_settings_from_path`] starts from [`TetherSettings::default()`],
//! deep-merges the JSON file over it, applies `TETHER_*` environment
//! overrides and validates the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{data_dir, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
