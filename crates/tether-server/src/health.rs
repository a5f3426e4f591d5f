//! `GET /health`.

use std::time::Instant;

use serde::Serialize;

/// Coarse server state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Accepting new sessions.
    Ok,
    /// At the concurrent-session cap; streams and reverts still work.
    AtCapacity,
    /// Draining; new sessions are refused.
    ShuttingDown,
}

/// Body of `GET /health`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Coarse state.
    pub status: HealthStatus,
    /// Whole seconds since start.
    pub uptime_secs: u64,
    /// Sessions with a live runner in this process.
    pub active_sessions: usize,
    /// Concurrent-session cap.
    pub max_sessions: usize,
}

impl HealthResponse {
    /// Build from live counters.
    pub fn new(started: Instant, active_sessions: usize, max_sessions: usize, shutting_down: bool) -> Self {
        let status = if shutting_down {
            HealthStatus::ShuttingDown
        } else if active_sessions >= max_sessions {
            HealthStatus::AtCapacity
        } else {
            HealthStatus::Ok
        };
        Self {
            status,
            uptime_secs: started.elapsed().as_secs(),
            active_sessions,
            max_sessions,
        }
    }
}
