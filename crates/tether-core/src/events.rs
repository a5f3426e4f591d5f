//! Copilot session event payloads.
//!
//! Every record in a session's event log carries one [`CopilotEvent`]. The
//! payload is a closed, tagged variant so readers can match exhaustively on
//! the cases they care about and skip the rest.
//!
//! Wire format: `{"type": "<snake_case>", ...camelCase fields}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{CheckpointId, ToolCallId, WorkflowId};

/// How a requested tool call was settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool ran and returned a result.
    Success,
    /// The tool ran (or was reported by the client) and failed.
    Error,
    /// The user declined the call.
    Rejected,
    /// No decision arrived within the bounded wait; treated as rejected.
    TimedOut,
    /// The call was handed off to run without blocking the session.
    Background,
}

impl ToolOutcome {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Rejected => "rejected",
            Self::TimedOut => "timed_out",
            Self::Background => "background",
        }
    }

    /// Whether the tool did not run because the user declined it. A decision
    /// that never arrived counts as a decline.
    pub fn is_rejection(self) -> bool {
        matches!(self, Self::Rejected | Self::TimedOut)
    }
}

/// Payload of a single event in a session log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CopilotEvent {
    /// Incremental model output.
    ContentDelta {
        /// Text fragment.
        text: String,
    },
    /// The model asked to run a tool.
    ToolCallRequested {
        /// Tool call identifier (mailbox key).
        tool_call_id: ToolCallId,
        /// Tool name.
        tool_name: String,
        /// Tool arguments as produced by the model.
        arguments: Value,
        /// Whether the session is suspended awaiting a human decision.
        requires_approval: bool,
    },
    /// A previously requested tool call has been settled.
    ToolCallResolved {
        /// Tool call identifier.
        tool_call_id: ToolCallId,
        /// Tool name.
        tool_name: String,
        /// How the call was settled.
        outcome: ToolOutcome,
        /// Tool output, if it ran.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        /// Human-readable detail (rejection reason, error message).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A workflow snapshot was taken before a mutating tool call.
    CheckpointCreated {
        /// The new checkpoint.
        checkpoint_id: CheckpointId,
        /// The workflow that was snapshotted.
        workflow_id: WorkflowId,
        /// The tool call about to mutate the workflow.
        tool_call_id: ToolCallId,
    },
    /// An error occurred. Terminal only when followed by status `error`.
    Error {
        /// Machine-readable category (`upstream`, `max_steps`, `stale_session`, ...).
        category: String,
        /// Human-readable detail.
        message: String,
    },
    /// Final summary appended on normal completion.
    Summary {
        /// Summary text.
        text: String,
        /// Number of model steps taken.
        steps: u32,
    },
}

impl CopilotEvent {
    /// The `type` tag of this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ContentDelta { .. } => "content_delta",
            Self::ToolCallRequested { .. } => "tool_call_requested",
            Self::ToolCallResolved { .. } => "tool_call_resolved",
            Self::CheckpointCreated { .. } => "checkpoint_created",
            Self::Error { .. } => "error",
            Self::Summary { .. } => "summary",
        }
    }

    /// Shorthand for an [`CopilotEvent::Error`].
    pub fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            category: category.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
