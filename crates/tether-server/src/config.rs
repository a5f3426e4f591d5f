//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tether_settings::TetherSettings;

/// Configuration for the tether HTTP server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Delay between tail-loop polls, in milliseconds.
    pub poll_interval_ms: u64,
    /// Wall-clock budget for one tail connection, in milliseconds.
    pub max_tail_duration_ms: u64,
    /// Upper bound on graceful shutdown, in milliseconds.
    pub shutdown_timeout_ms: u64,
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &TetherSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            poll_interval_ms: settings.stream.poll_interval_ms,
            max_tail_duration_ms: settings.stream.max_tail_duration_ms,
            shutdown_timeout_ms: settings.server.shutdown_timeout_ms,
        }
    }

    /// Tail poll interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Tail connection budget.
    pub fn max_tail_duration(&self) -> Duration {
        Duration::from_millis(self.max_tail_duration_ms)
    }

    /// Graceful shutdown budget.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            poll_interval_ms: 250,
            max_tail_duration_ms: 600_000,
            shutdown_timeout_ms: 10_000,
        }
    }
}
