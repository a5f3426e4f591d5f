//! `POST /api/copilot/tool-calls/{tool_call_id}/confirm`: hand a human
//! decision to the suspended session.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use tether_core::{DecisionStatus, ToolCallId};
use tracing::{info, instrument};

use super::json_body;
use crate::auth::Requester;
use crate::errors::ApiError;
use crate::server::AppState;

/// Request body.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// `accepted`, `rejected`, `error`, `success` or `background`.
    pub status: DecisionStatus,
    /// Optional note fed back to the agent.
    #[serde(default)]
    pub message: Option<String>,
}

/// Record the decision. A later decision for the same call overwrites it.
#[instrument(skip_all, fields(route = "copilot.confirm", tool_call_id = %tool_call_id))]
pub async fn confirm(
    State(state): State<AppState>,
    Path(tool_call_id): Path<ToolCallId>,
    requester: Requester,
    body: Result<Json<ConfirmRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let req = json_body(body)?;
    state
        .mailbox
        .record_decision(&tool_call_id, req.status, req.message.as_deref())
        .await?;
    info!(requester = %requester.id(), status = %req.status, "tool call decision recorded");
    Ok(Json(json!({ "ok": true })))
}
