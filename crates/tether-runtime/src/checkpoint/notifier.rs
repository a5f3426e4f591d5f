//! Live-view reset fan-out.

use serde::{Deserialize, Serialize};
use tether_core::{CheckpointId, WorkflowId};

/// Reason string sent when a checkpoint is restored.
pub const REASON_REVERT: &str = "revert";
/// Reason string sent when the agent replaces a workflow.
pub const REASON_AGENT_EDIT: &str = "agent_edit";

/// Tells live viewers to drop local state and re-read the workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowReset {
    /// Workflow whose persisted state changed.
    pub workflow_id: WorkflowId,
    /// Why (`revert`, `agent_edit`).
    pub reason: String,
    /// Checkpoint restored, for reverts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_id: Option<CheckpointId>,
}

/// Fire-and-forget notifier. Delivery is at-least-once at best; callers never
/// wait on it or observe failures.
#[cfg_attr(test, mockall::automock)]
pub trait WorkflowNotifier: Send + Sync {
    /// Broadcast a reset.
    fn notify_workflow_reset(&self, reset: &WorkflowReset);
}

/// Notifier that drops every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

impl WorkflowNotifier for NoopNotifier {
    fn notify_workflow_reset(&self, _reset: &WorkflowReset) {}
}
