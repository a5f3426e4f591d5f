//! Checkpoint & revert manager.

use std::sync::Arc;

use serde::Serialize;
use tether_core::workflow::{BlockRegistry, parse_workflow_state_text, serialize_workflow_state};
use tether_core::{CheckpointId, WorkflowId};
use tether_events::{Checkpoint, CheckpointSummary, NewCheckpoint, WorkflowStore};
use tracing::{info, instrument, warn};

use super::notifier::{REASON_REVERT, WorkflowNotifier, WorkflowReset};
use super::rebuild::rebuild_with_fresh_ids;
use crate::errors::CheckpointError;

/// Optional display metadata for a new checkpoint.
#[derive(Clone, Debug, Default)]
pub struct CheckpointMeta {
    /// Display name.
    pub name: Option<String>,
    /// Display description.
    pub description: Option<String>,
}

/// Result of a successful revert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevertOutcome {
    /// Workflow that was reset.
    pub workflow_id: WorkflowId,
    /// Checkpoint restored.
    pub checkpoint_id: CheckpointId,
    /// Non-fatal drops reported during rebuild.
    pub warnings: Vec<String>,
}

/// Snapshots workflows before agent mutations and restores them on request.
///
/// A revert is a hard reset: the rebuilt graph replaces the persisted state
/// in one transaction and live viewers are told to re-read it. Nothing is
/// ever merged.
pub struct CheckpointManager {
    store: WorkflowStore,
    registry: BlockRegistry,
    notifier: Arc<dyn WorkflowNotifier>,
}

impl CheckpointManager {
    /// Create a manager.
    pub fn new(store: WorkflowStore, registry: BlockRegistry, notifier: Arc<dyn WorkflowNotifier>) -> Self {
        Self {
            store,
            registry,
            notifier,
        }
    }

    /// Serialize and persist the workflow's current state.
    #[instrument(skip_all, fields(workflow_id = %workflow_id, requester = %requester_id))]
    pub fn snapshot(
        &self,
        workflow_id: &WorkflowId,
        requester_id: &str,
        meta: &CheckpointMeta,
    ) -> Result<Checkpoint, CheckpointError> {
        self.authorize_workflow(workflow_id, requester_id)?;
        let state = self.store.load_workflow_state(workflow_id)?;
        let snapshot = serialize_workflow_state(&state)
            .map_err(|e| CheckpointError::PersistenceFailure(e.to_string()))?;
        let checkpoint = self.store.insert_checkpoint(&NewCheckpoint {
            workflow_id,
            owner_id: requester_id,
            snapshot,
            name: meta.name.as_deref(),
            description: meta.description.as_deref(),
        })?;
        info!(
            checkpoint_id = %checkpoint.id,
            blocks = state.block_count(),
            edges = state.edge_count(),
            "checkpoint taken"
        );
        Ok(checkpoint)
    }

    /// Restore a checkpoint.
    ///
    /// Parse failures abort before anything is written. The replace itself
    /// is all-or-nothing.
    #[instrument(skip_all, fields(checkpoint_id = %checkpoint_id, requester = %requester_id))]
    pub fn revert(&self, checkpoint_id: &CheckpointId, requester_id: &str) -> Result<RevertOutcome, CheckpointError> {
        let checkpoint = self.authorize_checkpoint(checkpoint_id, requester_id)?;

        let parsed = parse_workflow_state_text(&checkpoint.snapshot).inspect_err(|e| {
            warn!(error = %e, "checkpoint snapshot rejected");
        })?;
        let rebuilt = rebuild_with_fresh_ids(&parsed, &self.registry);
        for warning in &rebuilt.warnings {
            warn!(workflow_id = %checkpoint.workflow_id, warning = %warning, "revert dropped element");
        }

        self.store
            .replace_workflow_state(&checkpoint.workflow_id, &rebuilt.state)?;

        self.notifier.notify_workflow_reset(&WorkflowReset {
            workflow_id: checkpoint.workflow_id.clone(),
            reason: REASON_REVERT.to_string(),
            checkpoint_id: Some(checkpoint.id.clone()),
        });
        info!(
            workflow_id = %checkpoint.workflow_id,
            blocks = rebuilt.state.block_count(),
            warnings = rebuilt.warnings.len(),
            "workflow reverted"
        );

        Ok(RevertOutcome {
            workflow_id: checkpoint.workflow_id,
            checkpoint_id: checkpoint.id,
            warnings: rebuilt.warnings,
        })
    }

    /// Checkpoints of a workflow, newest first.
    pub fn list(&self, workflow_id: &WorkflowId, requester_id: &str) -> Result<Vec<CheckpointSummary>, CheckpointError> {
        self.authorize_workflow(workflow_id, requester_id)?;
        Ok(self.store.list_checkpoints(workflow_id)?)
    }

    /// Edit display metadata. `None` fields are left unchanged.
    pub fn update_meta(
        &self,
        checkpoint_id: &CheckpointId,
        requester_id: &str,
        meta: &CheckpointMeta,
    ) -> Result<CheckpointSummary, CheckpointError> {
        let _ = self.authorize_checkpoint(checkpoint_id, requester_id)?;
        Ok(self.store.update_checkpoint_meta(
            checkpoint_id,
            meta.name.as_deref(),
            meta.description.as_deref(),
        )?)
    }

    fn authorize_workflow(&self, workflow_id: &WorkflowId, requester_id: &str) -> Result<(), CheckpointError> {
        match self.store.workflow_owner(workflow_id)? {
            None => Err(CheckpointError::NotFound(format!("workflow {workflow_id}"))),
            Some(owner) if owner == requester_id => Ok(()),
            Some(_) => Err(CheckpointError::Forbidden),
        }
    }

    /// A checkpoint is accessible to its creator or to the owner of its
    /// workflow.
    fn authorize_checkpoint(&self, checkpoint_id: &CheckpointId, requester_id: &str) -> Result<Checkpoint, CheckpointError> {
        let checkpoint = self
            .store
            .get_checkpoint(checkpoint_id)?
            .ok_or_else(|| CheckpointError::NotFound(format!("checkpoint {checkpoint_id}")))?;
        if checkpoint.owner_id == requester_id {
            return Ok(checkpoint);
        }
        match self.store.workflow_owner(&checkpoint.workflow_id)? {
            Some(owner) if owner == requester_id => Ok(checkpoint),
            _ => Err(CheckpointError::Forbidden),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
