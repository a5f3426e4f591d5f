//! Built-in copilot tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tether_core::workflow::{WorkflowState, parse_workflow_state_text, serialize_workflow_state};
use tether_events::WorkflowStore;
use tether_runtime::checkpoint::{REASON_AGENT_EDIT, WorkflowNotifier, WorkflowReset};
use tether_runtime::errors::ToolError;
use tether_runtime::{CopilotTool, ToolContext, ToolRegistry};
use tracing::info;

/// Name of [`EditWorkflowTool`].
pub const EDIT_WORKFLOW: &str = "edit_workflow";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EditArgs {
    #[serde(default)]
    state: Option<WorkflowState>,
    #[serde(default)]
    snapshot: Option<String>,
}

impl EditArgs {
    /// The proposed graph, validated the same way a stored snapshot is.
    fn into_state(self) -> Result<WorkflowState, ToolError> {
        let text = match (self.state, self.snapshot) {
            (Some(state), None) => {
                serialize_workflow_state(&state).map_err(|e| ToolError::InvalidArguments(e.to_string()))?
            }
            (None, Some(text)) => text,
            _ => {
                return Err(ToolError::InvalidArguments(
                    "exactly one of `state` or `snapshot` is required".into(),
                ));
            }
        };
        parse_workflow_state_text(&text).map_err(|e| ToolError::InvalidArguments(e.to_string()))
    }
}

/// Replaces the session's workflow with the graph in its arguments.
///
/// Gated on approval and checkpointed before it runs.
pub struct EditWorkflowTool {
    workflows: WorkflowStore,
    notifier: Arc<dyn WorkflowNotifier>,
}

impl EditWorkflowTool {
    /// Create the tool.
    pub fn new(workflows: WorkflowStore, notifier: Arc<dyn WorkflowNotifier>) -> Self {
        Self { workflows, notifier }
    }
}

#[async_trait]
impl CopilotTool for EditWorkflowTool {
    fn name(&self) -> &str {
        EDIT_WORKFLOW
    }

    fn requires_approval(&self) -> bool {
        true
    }

    fn mutates_workflow(&self) -> bool {
        true
    }

    async fn execute(&self, arguments: Value, ctx: &ToolContext) -> Result<Value, ToolError> {
        let workflow_id = ctx
            .workflow_id
            .clone()
            .ok_or_else(|| ToolError::Failed("session has no workflow".into()))?;
        let args: EditArgs =
            serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let state = args.into_state()?;

        self.workflows
            .replace_workflow_state(&workflow_id, &state)
            .map_err(|e| ToolError::Failed(e.to_string()))?;
        info!(
            workflow_id = %workflow_id,
            tool_call_id = %ctx.tool_call_id,
            blocks = state.block_count(),
            edges = state.edge_count(),
            "workflow replaced by agent"
        );
        self.notifier.notify_workflow_reset(&WorkflowReset {
            workflow_id: workflow_id.clone(),
            reason: REASON_AGENT_EDIT.into(),
            checkpoint_id: None,
        });

        Ok(json!({
            "workflowId": workflow_id,
            "blocks": state.block_count(),
            "edges": state.edge_count(),
        }))
    }
}

/// Registry with every built-in tool.
pub fn builtin_registry(workflows: WorkflowStore, notifier: Arc<dyn WorkflowNotifier>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(EditWorkflowTool::new(workflows, notifier)));
    registry
}
