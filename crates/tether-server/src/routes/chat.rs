//! `POST /api/copilot/chat`: start a background session.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tether_core::{SessionId, WorkflowId};
use tether_runtime::StartSession;
use tracing::instrument;

use super::json_body;
use crate::auth::Requester;
use crate::errors::ApiError;
use crate::server::AppState;

/// Request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    /// The user's message.
    pub message: String,
    /// Workflow the copilot edits.
    pub workflow_id: WorkflowId,
    /// Client-chosen session id.
    #[serde(default)]
    pub stream_id: Option<SessionId>,
}

/// Response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    /// Session to tail.
    pub session_id: SessionId,
}

/// Start a session; returns as soon as it exists.
#[instrument(skip_all, fields(route = "copilot.chat", requester = %requester.id()))]
pub async fn start_chat(
    State(state): State<AppState>,
    requester: Requester,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ChatResponse>), ApiError> {
    let req = json_body(body)?;
    if req.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message must not be empty".into()));
    }
    if state.shutdown.is_shutting_down() {
        return Err(ApiError::ShuttingDown);
    }
    let session_id = state.orchestrator.start_session(StartSession {
        session_id: req.stream_id,
        owner_id: requester.0,
        workflow_id: Some(req.workflow_id),
        message: req.message,
    })?;
    Ok((StatusCode::ACCEPTED, Json(ChatResponse { session_id })))
}
