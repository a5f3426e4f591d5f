//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file only needs the keys it changes.

mod copilot;
mod server;

pub use copilot::*;
pub use server::*;

use serde::{Deserialize, Serialize};
use tether_core::workflow::registry::DEFAULT_BLOCK_TYPES;

use crate::errors::{Result, SettingsError};

/// Workflow model settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowSettings {
    /// Block types accepted when rebuilding a workflow from a snapshot.
    pub known_block_types: Vec<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            known_block_types: DEFAULT_BLOCK_TYPES.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9090 },
///   "copilot": { "decisionWaitMs": 60000 }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TetherSettings {
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Stream delivery settings.
    pub stream: StreamSettings,
    /// Orchestrator settings.
    pub copilot: CopilotSettings,
    /// Workflow model settings.
    pub workflow: WorkflowSettings,
}

impl TetherSettings {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let c = &self.copilot;
        if c.decision_ttl_ms <= c.decision_wait_ms {
            return Err(SettingsError::invalid(
                "copilot.decisionTtlMs",
                format!("{} must exceed copilot.decisionWaitMs ({})", c.decision_ttl_ms, c.decision_wait_ms),
            ));
        }
        let non_zero = [
            ("stream.pollIntervalMs", self.stream.poll_interval_ms),
            ("copilot.decisionPollIntervalMs", c.decision_poll_interval_ms),
            ("copilot.watchdogIntervalMs", c.watchdog_interval_ms),
            ("copilot.maxSteps", u64::from(c.max_steps)),
            ("copilot.maxConcurrentSessions", u64::try_from(c.max_concurrent_sessions).unwrap_or(u64::MAX)),
        ];
        match non_zero.into_iter().find(|&(_, v)| v == 0) {
            Some((field, _)) => Err(SettingsError::invalid(field, "must be non-zero")),
            None => Ok(()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn defaults_validate() {
        TetherSettings::default().validate().unwrap();
    }

    #[test]
    fn ttl_must_exceed_wait() {
        let mut s = TetherSettings::default();
        s.copilot.decision_ttl_ms = s.copilot.decision_wait_ms;
        assert_matches!(s.validate(), Err(SettingsError::Invalid { field: "copilot.decisionTtlMs", .. }));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let mut s = TetherSettings::default();
        s.stream.poll_interval_ms = 0;
        assert_matches!(s.validate(), Err(SettingsError::Invalid { field: "stream.pollIntervalMs", .. }));
    }

    #[test]
    fn zero_max_steps_rejected() {
        let mut s = TetherSettings::default();
        s.copilot.max_steps = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn default_block_types_present() {
        let s = TetherSettings::default();
        assert!(s.workflow.known_block_types.iter().any(|t| t == "agent"));
    }

    #[test]
    fn empty_json_is_defaults() {
        let s: TetherSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, TetherSettings::default());
    }
}
