//! Session event reads: live SSE tail and one-shot batch.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use tether_core::{SessionId, SessionStatus};
use tether_events::LoggedEvent;
use tracing::instrument;

use crate::auth::Requester;
use crate::errors::ApiError;
use crate::server::AppState;
use crate::stream::{authorize_session, sse, tail_stream};

/// Standard SSE resume header.
pub const LAST_EVENT_ID_HEADER: &str = "last-event-id";

/// `?from=N`.
#[derive(Debug, Default, Deserialize)]
pub struct TailQuery {
    /// Last event id already seen.
    #[serde(default)]
    pub from: Option<u64>,
}

/// `?from=N&to=M`.
#[derive(Debug, Default, Deserialize)]
pub struct BatchQuery {
    /// Exclusive lower bound.
    #[serde(default)]
    pub from: Option<u64>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub to: Option<u64>,
}

/// Batch response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    /// Events in the requested window, ascending.
    pub events: Vec<LoggedEvent>,
    /// Session status, read before the events.
    pub status: SessionStatus,
    /// Cursor to pass as `from` on the next call.
    pub last_event_id: u64,
}

/// `GET /api/copilot/streams/{session_id}/tail`
#[instrument(skip_all, fields(route = "copilot.tail", session_id = %session_id))]
pub async fn tail(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    requester: Requester,
    headers: HeaderMap,
    query: Result<Query<TailQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let from = match last_event_id(&headers)? {
        Some(id) => id,
        None => query.from.unwrap_or(0),
    };
    let _ = authorize_session(&state.events, &session_id, requester.id())?;
    let stream = tail_stream(
        state.events.clone(),
        session_id,
        from,
        state.tail_timing,
        state.shutdown.token(),
    );
    Ok(sse::sse_response(stream))
}

/// `GET /api/copilot/streams/{session_id}/events`
#[instrument(skip_all, fields(route = "copilot.events", session_id = %session_id))]
pub async fn batch_read(
    State(state): State<AppState>,
    Path(session_id): Path<SessionId>,
    requester: Requester,
    query: Result<Query<BatchQuery>, QueryRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let from = query.from.unwrap_or(0);
    if query.to.is_some_and(|to| to < from) {
        return Err(ApiError::BadRequest("`to` must not be below `from`".into()));
    }
    let meta = authorize_session(&state.events, &session_id, requester.id())?;
    let events = state.events.read_events_range(&session_id, from, query.to)?;
    let last_event_id = events.last().map_or(from, |e| e.event_id);
    Ok(Json(BatchResponse {
        events,
        status: meta.status,
        last_event_id,
    }))
}

/// `Last-Event-ID` wins over `?from` so browser auto-reconnects resume in place.
fn last_event_id(headers: &HeaderMap) -> Result<Option<u64>, ApiError> {
    let Some(raw) = headers.get(LAST_EVENT_ID_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest("Last-Event-ID must be a non-negative integer".into()))
}
