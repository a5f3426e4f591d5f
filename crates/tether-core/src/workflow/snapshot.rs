//! Portable snapshot codec.
//!
//! A snapshot is a self-contained, versioned JSON document:
//!
//! ```text
//! {"version": 1, "blocks": {...}, "edges": [...], "loops": {...},
//!  "parallels": {...}, "isDeployed": false}
//! ```
//!
//! Parsing validates the document structure only. Dangling edges and
//! unknown block types are not parse errors; the revert path drops them
//! and reports warnings.

use serde::{Deserialize, Serialize};

use super::state::WorkflowState;

/// Current snapshot document version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Errors from encoding or decoding a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Text is not a well-formed snapshot document.
    #[error("malformed snapshot: {0}")]
    Malformed(String),

    /// Document version this build cannot read.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),

    /// A block is stored under a key that differs from its own id.
    #[error("block keyed as {key} declares id {id}")]
    KeyMismatch {
        /// Map key.
        key: String,
        /// Declared id.
        id: String,
    },

    /// A block position is not a finite number.
    #[error("block {0} has a non-finite position")]
    NonFinitePosition(String),

    /// An edge is missing an endpoint.
    #[error("edge {0} has an empty endpoint")]
    EmptyEdgeEndpoint(String),

    /// Encoding failed.
    #[error("snapshot encode failed: {0}")]
    Encode(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotOut<'a> {
    version: u32,
    #[serde(flatten)]
    state: &'a WorkflowState,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotIn {
    version: u32,
    #[serde(flatten)]
    state: WorkflowState,
}

/// Serialize a workflow state into portable snapshot text.
pub fn serialize_workflow_state(state: &WorkflowState) -> Result<String, SnapshotError> {
    serde_json::to_string(&SnapshotOut {
        version: SNAPSHOT_VERSION,
        state,
    })
    .map_err(|e| SnapshotError::Encode(e.to_string()))
}

/// Parse snapshot text back into a workflow state.
///
/// Ids in the returned state are the snapshot's own; callers that write the
/// graph back re-key it first.
pub fn parse_workflow_state_text(text: &str) -> Result<WorkflowState, SnapshotError> {
    let doc: SnapshotIn =
        serde_json::from_str(text).map_err(|e| SnapshotError::Malformed(e.to_string()))?;

    if doc.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(doc.version));
    }

    for (key, block) in &doc.state.blocks {
        if key != &block.id {
            return Err(SnapshotError::KeyMismatch {
                key: key.to_string(),
                id: block.id.to_string(),
            });
        }
        if !(block.position.x.is_finite() && block.position.y.is_finite()) {
            return Err(SnapshotError::NonFinitePosition(key.to_string()));
        }
    }

    if let Some(edge) = doc
        .state
        .edges
        .iter()
        .find(|e| e.source.is_empty() || e.target.is_empty())
    {
        return Err(SnapshotError::EmptyEdgeEndpoint(edge.id.clone()));
    }

    Ok(doc.state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
