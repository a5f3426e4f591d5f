//! Public record types returned by the stores.

use serde::{Deserialize, Serialize};
use tether_core::{
    CheckpointId, CopilotEvent, DecisionStatus, SessionId, SessionStatus, ToolCallId, WorkflowId,
};

use crate::errors::{EventStoreError, Result};
use crate::sqlite::row_types::{CheckpointRow, DecisionRow, EventRow, SessionRow};

/// Session metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    /// Session id.
    pub session_id: SessionId,
    /// Owning user. Every read and write must match.
    pub owner_id: String,
    /// Workflow being edited, if any.
    pub workflow_id: Option<WorkflowId>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Highest event id assigned so far (0 before the first append).
    pub last_event_id: u64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 last-write time.
    pub updated_at: String,
}

impl TryFrom<SessionRow> for SessionMeta {
    type Error = EventStoreError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let status = row
            .status
            .parse()
            .map_err(|e| EventStoreError::Corrupt(format!("session {}: {e}", row.id)))?;
        Ok(Self {
            last_event_id: to_event_id(row.last_event_id)?,
            session_id: SessionId::from(row.id),
            owner_id: row.owner_id,
            workflow_id: row.workflow_id.map(WorkflowId::from),
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// One committed event as seen by readers.
///
/// Serialized flat: `{"eventId": 3, "timestamp": "...", "type": "content_delta", "text": "..."}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEvent {
    /// Per-session sequence number.
    pub event_id: u64,
    /// RFC 3339 append time.
    pub timestamp: String,
    /// Event payload.
    #[serde(flatten)]
    pub payload: CopilotEvent,
}

impl TryFrom<EventRow> for LoggedEvent {
    type Error = EventStoreError;

    fn try_from(row: EventRow) -> Result<Self> {
        Ok(Self {
            event_id: to_event_id(row.event_id)?,
            timestamp: row.timestamp,
            payload: serde_json::from_str(&row.payload)?,
        })
    }
}

/// A recorded human decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Tool call the decision applies to.
    pub tool_call_id: ToolCallId,
    /// Decision.
    pub status: DecisionStatus,
    /// Optional user-supplied detail.
    pub message: Option<String>,
    /// RFC 3339 decision time.
    pub decided_at: String,
}

impl TryFrom<DecisionRow> for Decision {
    type Error = EventStoreError;

    fn try_from(row: DecisionRow) -> Result<Self> {
        let status = row
            .status
            .parse()
            .map_err(|e| EventStoreError::Corrupt(format!("decision {}: {e}", row.tool_call_id)))?;
        Ok(Self {
            tool_call_id: ToolCallId::from(row.tool_call_id),
            status,
            message: row.message,
            decided_at: row.decided_at,
        })
    }
}

/// A stored checkpoint including its snapshot text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    /// Checkpoint id.
    pub id: CheckpointId,
    /// Snapshotted workflow.
    pub workflow_id: WorkflowId,
    /// Owner at snapshot time.
    pub owner_id: String,
    /// Portable snapshot text.
    pub snapshot: String,
    /// Display name.
    pub name: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<CheckpointRow> for Checkpoint {
    fn from(row: CheckpointRow) -> Self {
        Self {
            id: CheckpointId::from(row.id),
            workflow_id: WorkflowId::from(row.workflow_id),
            owner_id: row.owner_id,
            snapshot: row.snapshot,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

/// Checkpoint listing entry (no snapshot body).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointSummary {
    /// Checkpoint id.
    pub id: CheckpointId,
    /// Snapshotted workflow.
    pub workflow_id: WorkflowId,
    /// Display name.
    pub name: Option<String>,
    /// Display description.
    pub description: Option<String>,
    /// RFC 3339 creation time.
    pub created_at: String,
}

impl From<Checkpoint> for CheckpointSummary {
    fn from(cp: Checkpoint) -> Self {
        Self {
            id: cp.id,
            workflow_id: cp.workflow_id,
            name: cp.name,
            description: cp.description,
            created_at: cp.created_at,
        }
    }
}

/// Input for [`crate::WorkflowStore::insert_checkpoint`].
#[derive(Clone, Debug)]
pub struct NewCheckpoint<'a> {
    /// Workflow the snapshot was taken from.
    pub workflow_id: &'a WorkflowId,
    /// Owner recorded on the checkpoint.
    pub owner_id: &'a str,
    /// Portable snapshot text.
    pub snapshot: String,
    /// Display name.
    pub name: Option<&'a str>,
    /// Display description.
    pub description: Option<&'a str>,
}

pub(crate) fn to_event_id(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| EventStoreError::Corrupt(format!("negative event id {raw}")))
}
