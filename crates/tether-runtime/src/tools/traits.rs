//! The trait every copilot tool implements.

use async_trait::async_trait;
use serde_json::Value;
use tether_core::{SessionId, ToolCallId, WorkflowId};

use crate::errors::ToolError;

// ─────────────────────────────────────────────────────────────────────────────
// Tool context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-invocation context handed to a tool.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Tool call being executed.
    pub tool_call_id: ToolCallId,
    /// Session that requested the call.
    pub session_id: SessionId,
    /// User the session runs on behalf of.
    pub owner_id: String,
    /// Workflow bound to the session, if any.
    pub workflow_id: Option<WorkflowId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// CopilotTool trait
// ─────────────────────────────────────────────────────────────────────────────

/// A discrete action the agent may take.
#[async_trait]
pub trait CopilotTool: Send + Sync {
    /// Name the model uses to call the tool.
    fn name(&self) -> &str;

    /// Whether the call must wait for a human decision before running.
    fn requires_approval(&self) -> bool {
        false
    }

    /// Whether the call edits the session's workflow. Mutating calls are
    /// always preceded by a checkpoint.
    fn mutates_workflow(&self) -> bool {
        false
    }

    /// Run the tool.
    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError>;
}
