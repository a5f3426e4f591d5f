//! Session and tool-call decision status enums.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a copilot session.
///
/// `Running` is the only non-terminal state. Once a session reaches
/// `Complete` or `Error` it never transitions again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The orchestrator is still producing events.
    Running,
    /// The session finished normally.
    Complete,
    /// The session ended on an unrecoverable failure.
    Error,
}

impl SessionStatus {
    /// Wire / column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// Whether no further transitions are allowed.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Whether `self → next` is a legal transition.
    ///
    /// Setting a status to its current value is allowed (idempotent writes).
    pub fn can_transition_to(self, next: Self) -> bool {
        self == next || !self.is_terminal()
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SessionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "error" => Ok(Self::Error),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

/// A human decision on a suspended tool call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    /// The client already ran the action successfully.
    Success,
    /// The client reported a failure.
    Error,
    /// The user approved the action.
    Accepted,
    /// The user declined the action.
    Rejected,
    /// Run the action without blocking the session.
    Background,
}

impl DecisionStatus {
    /// Wire / column representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Background => "background",
        }
    }

    /// Whether the orchestrator should execute the tool inline.
    pub fn permits_execution(self) -> bool {
        matches!(self, Self::Accepted | Self::Success)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecisionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "background" => Ok(Self::Background),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_can_move_to_terminal() {
        assert!(SessionStatus::Running.can_transition_to(SessionStatus::Complete));
        assert!(SessionStatus::Running.can_transition_to(SessionStatus::Error));
    }

    #[test]
    fn terminal_states_are_final() {
        assert!(!SessionStatus::Complete.can_transition_to(SessionStatus::Running));
        assert!(!SessionStatus::Complete.can_transition_to(SessionStatus::Error));
        assert!(!SessionStatus::Error.can_transition_to(SessionStatus::Complete));
    }

    #[test]
    fn same_status_is_idempotent() {
        assert!(SessionStatus::Complete.can_transition_to(SessionStatus::Complete));
    }

    #[test]
    fn session_status_parse_roundtrip() {
        for s in [
            SessionStatus::Running,
            SessionStatus::Complete,
            SessionStatus::Error,
        ] {
            assert_eq!(s.as_str().parse::<SessionStatus>().unwrap(), s);
        }
        assert!("paused".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn decision_status_serde_is_snake_case() {
        let json = serde_json::to_string(&DecisionStatus::Background).unwrap();
        assert_eq!(json, "\"background\"");
        let back: DecisionStatus = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(back, DecisionStatus::Accepted);
    }

    #[test]
    fn only_accepted_and_success_execute() {
        assert!(DecisionStatus::Accepted.permits_execution());
        assert!(DecisionStatus::Success.permits_execution());
        assert!(!DecisionStatus::Rejected.permits_execution());
        assert!(!DecisionStatus::Error.permits_execution());
        assert!(!DecisionStatus::Background.permits_execution());
    }
}
