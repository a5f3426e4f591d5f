//! Session runner: drives one copilot session end to end and is the only
//! writer of its event log.
//!
//! Each step: call the model (with retries) → stream deltas → resolve every
//! requested tool call (suspending on the mailbox where approval is needed,
//! checkpointing before workflow mutations) → stop when the model reports
//! `done`. The session always ends `complete` or `error`.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tether_core::{CopilotEvent, DecisionStatus, SessionId, SessionStatus, ToolOutcome, WorkflowId};
use tether_settings::CopilotSettings;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use super::tool_gate::{GateOutcome, GateTiming, await_decision};
use crate::checkpoint::{CheckpointManager, CheckpointMeta};
use crate::errors::{ModelError, RuntimeError};
use crate::mailbox::Mailbox;
use crate::model::{ModelClient, StepContext, StepOutput, ToolCallRequest, ToolResultMessage};
use crate::tools::{CopilotTool, ToolContext, ToolRegistry};

/// Tunables for a session run.
#[derive(Clone, Copy, Debug)]
pub struct RunnerConfig {
    /// Mailbox polling for approval-gated tool calls.
    pub gate: GateTiming,
    /// Model steps allowed before the session is failed.
    pub max_steps: u32,
    /// Retries for a transient model failure.
    pub model_retries: u32,
    /// First retry delay; doubles on each attempt.
    pub model_retry_base_delay: Duration,
}

impl RunnerConfig {
    /// Build from settings.
    pub fn from_settings(settings: &CopilotSettings) -> Self {
        Self {
            gate: GateTiming {
                poll_interval: settings.decision_poll_interval(),
                max_wait: settings.decision_wait(),
            },
            max_steps: settings.max_steps,
            model_retries: settings.model_retries,
            model_retry_base_delay: settings.model_retry_base_delay(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::from_settings(&CopilotSettings::default())
    }
}

/// Shared collaborators for every session.
pub struct RunnerDeps {
    /// Event log.
    pub event_store: tether_events::EventStore,
    /// Decision handoff.
    pub mailbox: Arc<dyn Mailbox>,
    /// Model layer.
    pub model: Arc<dyn ModelClient>,
    /// Available tools.
    pub tools: Arc<ToolRegistry>,
    /// Pre-mutation snapshots.
    pub checkpoints: Arc<CheckpointManager>,
    /// Tunables.
    pub config: RunnerConfig,
}

/// Identity and input of one session.
#[derive(Clone, Debug)]
pub struct SessionSpec {
    /// Session id (already created in the store).
    pub session_id: SessionId,
    /// User the session runs for.
    pub owner_id: String,
    /// Workflow being edited.
    pub workflow_id: Option<WorkflowId>,
    /// The user's chat message.
    pub message: String,
}

/// Runs one session.
pub struct SessionRunner {
    deps: Arc<RunnerDeps>,
    spec: SessionSpec,
    cancel: CancellationToken,
}

impl SessionRunner {
    /// Create a runner for a session that already exists in the store.
    pub fn new(deps: Arc<RunnerDeps>, spec: SessionSpec, cancel: CancellationToken) -> Self {
        Self { deps, spec, cancel }
    }

    /// Run to completion and return the final status.
    ///
    /// Returns `Running` only if the terminal write itself failed; the
    /// watchdog will fail the session once it is stale.
    #[instrument(skip_all, fields(session_id = %self.spec.session_id))]
    pub async fn run(self) -> SessionStatus {
        let store = &self.deps.event_store;
        let session_id = &self.spec.session_id;
        let finished = match self.drive().await {
            Ok((text, steps)) => {
                info!(steps, "session complete");
                store
                    .finish_session(session_id, &CopilotEvent::Summary { text, steps }, SessionStatus::Complete)
                    .map(|_| SessionStatus::Complete)
            }
            Err(e) => {
                warn!(category = e.category(), error = %e, "session failed");
                store
                    .fail_session(session_id, e.category(), &e.to_string())
                    .map(|_| SessionStatus::Error)
            }
        };
        finished.unwrap_or_else(|e| {
            error!(error = %e, "could not record terminal status");
            SessionStatus::Running
        })
    }

    async fn drive(&self) -> Result<(String, u32), RuntimeError> {
        let mut ctx = StepContext {
            session_id: self.spec.session_id.clone(),
            workflow_id: self.spec.workflow_id.clone(),
            message: self.spec.message.clone(),
            step: 0,
            tool_results: Vec::new(),
            tools: self.deps.tools.names(),
        };

        for step in 1..=self.deps.config.max_steps {
            if self.cancel.is_cancelled() {
                return Err(RuntimeError::Cancelled);
            }
            ctx.step = step;
            let output = self.call_model(&ctx).await?;

            for text in output.deltas {
                let _ = self.append(&CopilotEvent::ContentDelta { text })?;
            }
            for call in output.tool_calls {
                let result = self.resolve_tool_call(call).await?;
                ctx.tool_results.push(result);
            }
            if output.done {
                return Ok((output.summary.unwrap_or_default(), step));
            }
        }
        Err(RuntimeError::MaxSteps(self.deps.config.max_steps))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Model
    // ─────────────────────────────────────────────────────────────────────

    async fn call_model(&self, ctx: &StepContext) -> Result<StepOutput, RuntimeError> {
        let config = &self.deps.config;
        let mut attempt: u32 = 0;
        loop {
            let result: Result<StepOutput, ModelError> = tokio::select! {
                () = self.cancel.cancelled() => return Err(RuntimeError::Cancelled),
                r = self.deps.model.run_step(ctx) => r,
            };
            match result {
                Ok(output) => return Ok(output),
                Err(e) if e.is_retryable() && attempt < config.model_retries => {
                    let delay = config
                        .model_retry_base_delay
                        .saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(step = ctx.step, attempt, delay_ms = delay.as_millis() as u64, error = %e, "model step failed, retrying");
                    tokio::select! {
                        () = self.cancel.cancelled() => return Err(RuntimeError::Cancelled),
                        () = sleep(delay) => {}
                    }
                }
                Err(e) => return Err(RuntimeError::Upstream(e)),
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tools
    // ─────────────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(tool_call_id = %call.id, tool_name = %call.name))]
    async fn resolve_tool_call(&self, call: ToolCallRequest) -> Result<ToolResultMessage, RuntimeError> {
        let tool = self.deps.tools.get(&call.name);
        let requires_approval = tool.as_ref().is_some_and(|t| t.requires_approval());
        let _ = self.append(&CopilotEvent::ToolCallRequested {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            arguments: call.arguments.clone(),
            requires_approval,
        })?;

        let Some(tool) = tool else {
            warn!("unknown tool");
            return self.resolve(&call, ToolOutcome::Error, None, Some(format!("unknown tool: {}", call.name)));
        };

        if requires_approval {
            info!("tool call suspended pending decision");
            match await_decision(self.deps.mailbox.as_ref(), &call.id, self.deps.config.gate, &self.cancel).await {
                GateOutcome::Cancelled => return Err(RuntimeError::Cancelled),
                GateOutcome::TimedOut => {
                    warn!(waited_ms = self.deps.config.gate.max_wait.as_millis() as u64, "no decision, treating as rejected");
                    return self.resolve(
                        &call,
                        ToolOutcome::TimedOut,
                        None,
                        Some("no decision received in time; treated as rejected".into()),
                    );
                }
                GateOutcome::Decided(decision) if decision.status.permits_execution() => {}
                GateOutcome::Decided(decision) => {
                    let message = decision.message;
                    return match decision.status {
                        DecisionStatus::Background => {
                            if let Some(refusal) = self.checkpoint_if_mutating(tool.as_ref(), &call)? {
                                return self.resolve(&call, ToolOutcome::Error, None, Some(refusal));
                            }
                            self.spawn_background(tool, &call);
                            self.resolve(&call, ToolOutcome::Background, None, message)
                        }
                        DecisionStatus::Error => self.resolve(&call, ToolOutcome::Error, None, message),
                        _ => self.resolve(
                            &call,
                            ToolOutcome::Rejected,
                            None,
                            Some(message.unwrap_or_else(|| "rejected by user".into())),
                        ),
                    };
                }
            }
        }

        if let Some(refusal) = self.checkpoint_if_mutating(tool.as_ref(), &call)? {
            return self.resolve(&call, ToolOutcome::Error, None, Some(refusal));
        }

        let ctx = self.tool_context(&call);
        let result = tokio::select! {
            () = self.cancel.cancelled() => return Err(RuntimeError::Cancelled),
            r = tool.execute(call.arguments.clone(), &ctx) => r,
        };
        match result {
            Ok(value) => self.resolve(&call, ToolOutcome::Success, Some(value), None),
            Err(e) => {
                warn!(error = %e, "tool failed");
                self.resolve(&call, ToolOutcome::Error, None, Some(e.to_string()))
            }
        }
    }

    /// Snapshot the workflow before a mutating tool runs. Returns a refusal
    /// message when the tool must not run.
    fn checkpoint_if_mutating(
        &self,
        tool: &dyn CopilotTool,
        call: &ToolCallRequest,
    ) -> Result<Option<String>, RuntimeError> {
        if !tool.mutates_workflow() {
            return Ok(None);
        }
        let Some(workflow_id) = &self.spec.workflow_id else {
            return Ok(Some("session has no workflow to checkpoint".into()));
        };
        let meta = CheckpointMeta {
            name: Some(format!("Before {}", call.name)),
            description: None,
        };
        match self.deps.checkpoints.snapshot(workflow_id, &self.spec.owner_id, &meta) {
            Ok(checkpoint) => {
                let _ = self.append(&CopilotEvent::CheckpointCreated {
                    checkpoint_id: checkpoint.id,
                    workflow_id: workflow_id.clone(),
                    tool_call_id: call.id.clone(),
                })?;
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "checkpoint failed, refusing mutation");
                Ok(Some(format!("checkpoint failed: {e}")))
            }
        }
    }

    fn spawn_background(&self, tool: Arc<dyn CopilotTool>, call: &ToolCallRequest) {
        let ctx = self.tool_context(call);
        let arguments = call.arguments.clone();
        drop(tokio::spawn(async move {
            match tool.execute(arguments, &ctx).await {
                Ok(_) => debug!(tool_call_id = %ctx.tool_call_id, "background tool finished"),
                Err(e) => warn!(tool_call_id = %ctx.tool_call_id, error = %e, "background tool failed"),
            }
        }));
    }

    fn tool_context(&self, call: &ToolCallRequest) -> ToolContext {
        ToolContext {
            tool_call_id: call.id.clone(),
            session_id: self.spec.session_id.clone(),
            owner_id: self.spec.owner_id.clone(),
            workflow_id: self.spec.workflow_id.clone(),
        }
    }

    fn resolve(
        &self,
        call: &ToolCallRequest,
        outcome: ToolOutcome,
        result: Option<Value>,
        message: Option<String>,
    ) -> Result<ToolResultMessage, RuntimeError> {
        let _ = self.append(&CopilotEvent::ToolCallResolved {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome,
            result: result.clone(),
            message: message.clone(),
        })?;
        debug!(outcome = outcome.as_str(), "tool call resolved");
        let content = result.unwrap_or_else(|| json!({ "outcome": outcome.as_str(), "message": message }));
        Ok(ToolResultMessage {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            outcome,
            content,
        })
    }

    fn append(&self, event: &CopilotEvent) -> Result<u64, RuntimeError> {
        Ok(self.deps.event_store.append_event(&self.spec.session_id, event)?)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
