//! `GET /api/workflows/{workflow_id}/live`: reset notifications for viewers
//! of one workflow.

use axum::extract::{Path, State};
use axum::response::Response;
use tether_core::WorkflowId;
use tracing::instrument;

use crate::auth::Requester;
use crate::errors::ApiError;
use crate::server::AppState;
use crate::stream::{live_stream, sse};

/// Open a live-view SSE feed.
#[instrument(skip_all, fields(route = "workflow.live", workflow_id = %workflow_id))]
pub async fn watch(
    State(state): State<AppState>,
    Path(workflow_id): Path<WorkflowId>,
    requester: Requester,
) -> Result<Response, ApiError> {
    match state.workflows.workflow_owner(&workflow_id)? {
        None => return Err(ApiError::NotFound(format!("workflow {workflow_id}"))),
        Some(owner) if owner != requester.id() => return Err(ApiError::Forbidden),
        Some(_) => {}
    }
    let rx = state.live.subscribe(&workflow_id);
    Ok(sse::sse_response(live_stream(rx, state.shutdown.token())))
}
