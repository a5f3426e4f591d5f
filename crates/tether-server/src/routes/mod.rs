//! HTTP routes under `/api`.

pub mod chat;
pub mod checkpoints;
pub mod live;
pub mod streams;
pub mod tool_calls;

use axum::Json;
use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, patch, post};

use crate::errors::ApiError;
use crate::server::AppState;

/// Every `/api` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/copilot/chat", post(chat::start_chat))
        .route("/api/copilot/streams/{session_id}/tail", get(streams::tail))
        .route("/api/copilot/streams/{session_id}/events", get(streams::batch_read))
        .route("/api/copilot/tool-calls/{tool_call_id}/confirm", post(tool_calls::confirm))
        .route(
            "/api/workflows/{workflow_id}/checkpoints",
            post(checkpoints::create).get(checkpoints::list),
        )
        .route("/api/workflows/{workflow_id}/live", get(live::watch))
        .route("/api/checkpoints/{checkpoint_id}", patch(checkpoints::update))
        .route("/api/checkpoints/{checkpoint_id}/revert", post(checkpoints::revert))
}

/// Unwrap a JSON body, turning extractor rejections into a 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(v)| v).map_err(|e| ApiError::BadRequest(e.body_text()))
}
