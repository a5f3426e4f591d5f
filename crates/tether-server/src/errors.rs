//! HTTP error type and status mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tether_events::EventStoreError;
use tether_runtime::{CheckpointError, MailboxError, RuntimeError};
use tracing::error;

/// Error returned by every handler. Renders as
/// `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No `x-user-id` header.
    #[error("missing caller identity")]
    Unauthorized,
    /// Malformed input.
    #[error("{0}")]
    BadRequest(String),
    /// Session, workflow or checkpoint is absent.
    #[error("{0} not found")]
    NotFound(String),
    /// Caller does not own the resource.
    #[error("forbidden")]
    Forbidden,
    /// Caller-chosen session id already exists.
    #[error("session {0} already exists")]
    Conflict(String),
    /// Checkpoint snapshot could not be parsed.
    #[error("bad snapshot: {0}")]
    BadSnapshot(String),
    /// Concurrent session limit reached.
    #[error("maximum concurrent sessions ({0}) reached")]
    MaxSessions(usize),
    /// Server is draining.
    #[error("server is shutting down")]
    ShuttingDown,
    /// A transactional write or read failed.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl ApiError {
    /// Machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Forbidden => "FORBIDDEN",
            Self::Conflict(_) => "SESSION_EXISTS",
            Self::BadSnapshot(_) => "BAD_SNAPSHOT",
            Self::MaxSessions(_) => "MAX_SESSIONS_REACHED",
            Self::ShuttingDown => "SHUTTING_DOWN",
            Self::Persistence(_) => "PERSISTENCE_FAILURE",
        }
    }

    /// HTTP status.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadSnapshot(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::MaxSessions(_) | Self::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
            Self::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "request failed");
        }
        let body = Json(json!({
            "error": { "code": self.code(), "message": self.to_string() }
        }));
        (status, body).into_response()
    }
}

impl From<EventStoreError> for ApiError {
    fn from(e: EventStoreError) -> Self {
        match e {
            EventStoreError::SessionNotFound(id) => Self::NotFound(format!("session {id}")),
            EventStoreError::WorkflowNotFound(id) => Self::NotFound(format!("workflow {id}")),
            EventStoreError::CheckpointNotFound(id) => Self::NotFound(format!("checkpoint {id}")),
            EventStoreError::SessionExists(id) => Self::Conflict(id),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<RuntimeError> for ApiError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::NotFound(what) => Self::NotFound(what),
            RuntimeError::Forbidden => Self::Forbidden,
            RuntimeError::SessionExists(id) => Self::Conflict(id),
            RuntimeError::CapacityReached(max) => Self::MaxSessions(max),
            RuntimeError::ShuttingDown | RuntimeError::Cancelled => Self::ShuttingDown,
            RuntimeError::Persistence(e) => e.into(),
            other => Self::Persistence(other.to_string()),
        }
    }
}

impl From<CheckpointError> for ApiError {
    fn from(e: CheckpointError) -> Self {
        match e {
            CheckpointError::NotFound(what) => Self::NotFound(what),
            CheckpointError::Forbidden => Self::Forbidden,
            CheckpointError::BadSnapshot(e) => Self::BadSnapshot(e.to_string()),
            CheckpointError::PersistenceFailure(msg) => Self::Persistence(msg),
        }
    }
}

impl From<MailboxError> for ApiError {
    fn from(e: MailboxError) -> Self {
        Self::Persistence(e.to_string())
    }
}
