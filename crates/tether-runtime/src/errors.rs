//! Runtime error types.

use tether_core::workflow::SnapshotError;
use tether_events::EventStoreError;

/// Errors from the external model boundary.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Worth retrying (timeouts, 5xx, rate limits).
    #[error("transient model error: {0}")]
    Transient(String),

    /// Retrying will not help (bad request, auth, malformed response).
    #[error("model error: {0}")]
    Fatal(String),
}

impl ModelError {
    /// Whether the orchestrator should retry the step.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors raised by a tool implementation.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments failed validation.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran and failed.
    #[error("{0}")]
    Failed(String),
}

/// Mailbox storage failures.
#[derive(Debug, thiserror::Error)]
pub enum MailboxError {
    /// The backing store is unavailable.
    #[error("mailbox unavailable: {0}")]
    Unavailable(String),
}

impl From<EventStoreError> for MailboxError {
    fn from(err: EventStoreError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Checkpoint and revert failures.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    /// Checkpoint or workflow does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Requester does not own the checkpoint or its workflow.
    #[error("forbidden")]
    Forbidden,

    /// Snapshot text could not be parsed into a graph.
    #[error("bad snapshot: {0}")]
    BadSnapshot(#[from] SnapshotError),

    /// A read or the atomic replace failed; nothing was changed.
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
}

impl From<EventStoreError> for CheckpointError {
    fn from(err: EventStoreError) -> Self {
        if err.is_not_found() {
            Self::NotFound(err.to_string())
        } else {
            Self::PersistenceFailure(err.to_string())
        }
    }
}

/// Errors that can occur while starting or running a session.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The model layer failed after retries.
    #[error("upstream failure: {0}")]
    Upstream(#[from] ModelError),

    /// The session exceeded its step budget.
    #[error("max steps ({0}) exceeded")]
    MaxSteps(u32),

    /// The session was cancelled by server shutdown.
    #[error("session cancelled by shutdown")]
    Cancelled,

    /// The event log could not be written.
    #[error("persistence error: {0}")]
    Persistence(#[from] EventStoreError),

    /// A session with this id already exists.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Too many sessions are running.
    #[error("max concurrent sessions ({0}) reached")]
    CapacityReached(usize),

    /// The orchestrator is shutting down and accepts no new work.
    #[error("shutting down")]
    ShuttingDown,

    /// Workflow or session lookup failed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Requester does not own the referenced workflow.
    #[error("forbidden")]
    Forbidden,
}

impl RuntimeError {
    /// Category string carried by the final `error` event.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Upstream(_) => "upstream",
            Self::MaxSteps(_) => "max_steps",
            Self::Cancelled | Self::ShuttingDown => "shutdown",
            Self::Persistence(_) => "persistence",
            Self::SessionExists(_) => "session_exists",
            Self::CapacityReached(_) => "capacity",
            Self::NotFound(_) => "not_found",
            Self::Forbidden => "forbidden",
        }
    }
}
