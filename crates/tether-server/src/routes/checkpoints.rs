//! Checkpoint routes: create, list, rename, revert.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tether_core::{CheckpointId, WorkflowId};
use tether_events::CheckpointSummary;
use tether_runtime::checkpoint::{CheckpointMeta, RevertOutcome};
use tracing::instrument;

use super::json_body;
use crate::auth::Requester;
use crate::errors::ApiError;
use crate::server::AppState;

/// Optional display metadata.
#[derive(Debug, Default, Deserialize)]
pub struct MetaRequest {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Display description.
    #[serde(default)]
    pub description: Option<String>,
}

impl From<MetaRequest> for CheckpointMeta {
    fn from(req: MetaRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
        }
    }
}

/// Create response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedCheckpoint {
    /// New checkpoint id.
    pub checkpoint_id: CheckpointId,
    /// Listing entry for the new checkpoint.
    pub checkpoint: CheckpointSummary,
}

/// `POST /api/workflows/{workflow_id}/checkpoints`. The body is optional.
#[instrument(skip_all, fields(route = "checkpoint.create", workflow_id = %workflow_id))]
pub async fn create(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
    requester: Requester,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedCheckpoint>), ApiError> {
    let meta: MetaRequest = if body.iter().all(u8::is_ascii_whitespace) {
        MetaRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let checkpoint = state
        .checkpoints
        .snapshot(&workflow_id, requester.id(), &meta.into())?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedCheckpoint {
            checkpoint_id: checkpoint.id.clone(),
            checkpoint: checkpoint.into(),
        }),
    ))
}

/// `GET /api/workflows/{workflow_id}/checkpoints`, newest first.
#[instrument(skip_all, fields(route = "checkpoint.list", workflow_id = %workflow_id))]
pub async fn list(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
    requester: Requester,
) -> Result<Json<Value>, ApiError> {
    let checkpoints = state.checkpoints.list(&workflow_id, requester.id())?;
    Ok(Json(json!({ "checkpoints": checkpoints })))
}

/// `PATCH /api/checkpoints/{checkpoint_id}`
#[instrument(skip_all, fields(route = "checkpoint.update", checkpoint_id = %checkpoint_id))]
pub async fn update(
    State(state): State<AppState>,
    Path(checkpoint_id): Path<CheckpointId>,
    requester: Requester,
    body: Result<Json<MetaRequest>, JsonRejection>,
) -> Result<Json<CheckpointSummary>, ApiError> {
    let meta = json_body(body)?;
    let summary = state
        .checkpoints
        .update_meta(&checkpoint_id, requester.id(), &meta.into())?;
    Ok(Json(summary))
}

/// `POST /api/checkpoints/{checkpoint_id}/revert`
#[instrument(skip_all, fields(route = "checkpoint.revert", checkpoint_id = %checkpoint_id))]
pub async fn revert(
    State(state): State<AppState>,
    Path(checkpoint_id): Path<CheckpointId>,
    requester: Requester,
) -> Result<Json<RevertOutcome>, ApiError> {
    Ok(Json(state.checkpoints.revert(&checkpoint_id, requester.id())?))
}
