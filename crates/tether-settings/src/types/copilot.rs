//! Stream delivery and copilot orchestration tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Resumable stream delivery settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Tail loop poll interval in milliseconds.
    pub poll_interval_ms: u64,
    /// Wall-clock budget for one tail connection, in milliseconds.
    pub max_tail_duration_ms: u64,
    /// How long terminal sessions are retained before purge, in milliseconds.
    pub retention_grace_ms: u64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            max_tail_duration_ms: 600_000,
            retention_grace_ms: 3_600_000,
        }
    }
}

impl StreamSettings {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Tail budget as a [`Duration`].
    pub fn max_tail_duration(&self) -> Duration {
        Duration::from_millis(self.max_tail_duration_ms)
    }

    /// Retention grace as a [`Duration`].
    pub fn retention_grace(&self) -> Duration {
        Duration::from_millis(self.retention_grace_ms)
    }
}

/// Copilot orchestrator settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CopilotSettings {
    /// Mailbox poll interval while a tool call is suspended, in milliseconds.
    pub decision_poll_interval_ms: u64,
    /// Bounded wait for a human decision, in milliseconds.
    pub decision_wait_ms: u64,
    /// Lifetime of a recorded decision, in milliseconds.
    pub decision_ttl_ms: u64,
    /// Maximum model steps per session.
    pub max_steps: u32,
    /// Retries for a failed model step.
    pub model_retries: u32,
    /// Base delay for exponential model retry backoff, in milliseconds.
    pub model_retry_base_delay_ms: u64,
    /// Age after which an orphaned running session is failed, in milliseconds.
    pub max_session_age_ms: u64,
    /// Watchdog sweep interval, in milliseconds.
    pub watchdog_interval_ms: u64,
    /// Model endpoint URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_endpoint: Option<String>,
    /// Maximum concurrently running sessions.
    pub max_concurrent_sessions: usize,
}

impl Default for CopilotSettings {
    fn default() -> Self {
        Self {
            decision_poll_interval_ms: 500,
            decision_wait_ms: 120_000,
            decision_ttl_ms: 300_000,
            max_steps: 25,
            model_retries: 2,
            model_retry_base_delay_ms: 500,
            max_session_age_ms: 1_800_000,
            watchdog_interval_ms: 60_000,
            model_endpoint: None,
            max_concurrent_sessions: 64,
        }
    }
}

impl CopilotSettings {
    /// Decision poll interval as a [`Duration`].
    pub fn decision_poll_interval(&self) -> Duration {
        Duration::from_millis(self.decision_poll_interval_ms)
    }

    /// Bounded decision wait as a [`Duration`].
    pub fn decision_wait(&self) -> Duration {
        Duration::from_millis(self.decision_wait_ms)
    }

    /// Decision TTL as a [`Duration`].
    pub fn decision_ttl(&self) -> Duration {
        Duration::from_millis(self.decision_ttl_ms)
    }

    /// Retry base delay as a [`Duration`].
    pub fn model_retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.model_retry_base_delay_ms)
    }

    /// Maximum session age as a [`Duration`].
    pub fn max_session_age(&self) -> Duration {
        Duration::from_millis(self.max_session_age_ms)
    }

    /// Watchdog interval as a [`Duration`].
    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms)
    }
}
