//! Model boundary: one `run_step` call per unit of agent work.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tether_core::{SessionId, ToolCallId, ToolOutcome, WorkflowId};

use crate::errors::ModelError;

/// A tool call the model wants to make.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    /// Id assigned by the model layer.
    pub id: ToolCallId,
    /// Tool name.
    pub name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Value,
}

/// Result of a resolved tool call, fed back to the model on the next step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    /// Tool call.
    pub tool_call_id: ToolCallId,
    /// Tool name.
    pub tool_name: String,
    /// How the call resolved.
    pub outcome: ToolOutcome,
    /// Tool output, or a synthetic error payload.
    pub content: Value,
}

/// Everything the model sees for one step.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepContext {
    /// Session id.
    pub session_id: SessionId,
    /// Workflow bound to the session.
    pub workflow_id: Option<WorkflowId>,
    /// The user's chat message.
    pub message: String,
    /// 1-based step number.
    pub step: u32,
    /// Results of every tool call resolved so far, in order.
    pub tool_results: Vec<ToolResultMessage>,
    /// Names of tools the model may call.
    pub tools: Vec<String>,
}

/// Output of one step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StepOutput {
    /// Text deltas to stream to the client.
    pub deltas: Vec<String>,
    /// Tool calls to resolve before the next step.
    pub tool_calls: Vec<ToolCallRequest>,
    /// The model has finished.
    pub done: bool,
    /// Final summary text, used when `done`.
    pub summary: Option<String>,
}

/// External model/tool-selection layer. May be slow; transient failures are
/// retried by the orchestrator.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Run one step.
    async fn run_step(&self, ctx: &StepContext) -> Result<StepOutput, ModelError>;
}
