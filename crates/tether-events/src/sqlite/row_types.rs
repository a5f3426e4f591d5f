//! Raw database row shapes.
//!
//! Conversion to the public API types in [`crate::types`] happens in the
//! store layer.

/// Raw row from `sessions`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRow {
    /// Session id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Workflow the session edits.
    pub workflow_id: Option<String>,
    /// `running`, `complete` or `error`.
    pub status: String,
    /// High-water mark of assigned event ids.
    pub last_event_id: i64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 last-write time.
    pub updated_at: String,
}

/// Raw row from `events`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRow {
    /// Owning session.
    pub session_id: String,
    /// Per-session sequence number, starting at 1.
    pub event_id: i64,
    /// Denormalized payload `type` tag.
    pub event_type: String,
    /// JSON payload.
    pub payload: String,
    /// RFC 3339 append time.
    pub timestamp: String,
}

/// Raw row from `tool_decisions`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecisionRow {
    /// Tool call id.
    pub tool_call_id: String,
    /// Decision status.
    pub status: String,
    /// Optional message.
    pub message: Option<String>,
    /// RFC 3339 decision time.
    pub decided_at: String,
    /// Unix epoch milliseconds after which the row is ignored.
    pub expires_at_ms: i64,
}

/// Raw row from `workflows`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkflowRow {
    /// Workflow id.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Deployment flag.
    pub is_deployed: bool,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 last replace time.
    pub updated_at: String,
}

/// Raw row from `checkpoints`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckpointRow {
    /// Checkpoint id.
    pub id: String,
    /// Snapshotted workflow.
    pub workflow_id: String,
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
