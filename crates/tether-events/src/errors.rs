//! Persistence errors.
//!
//! Storage failures (`Sqlite`, `Pool`, `Serde`, `Migration`, `Corrupt`) are
//! opaque to callers. The remaining variants are domain outcomes that the
//! runtime and HTTP layers map onto their own taxonomies.

use thiserror::Error;

/// Failure from any store in this crate.
#[derive(Debug, Error)]
pub enum EventStoreError {
    /// Underlying `SQLite` failure.
    #[error("database: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// No connection could be checked out.
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),

    /// A JSON column failed to encode or decode.
    #[error("json column: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema upgrade failed.
    #[error("schema migration failed: {message}")]
    Migration {
        /// Which step failed.
        message: String,
    },

    /// A stored value no longer decodes.
    #[error("unreadable row: {0}")]
    Corrupt(String),

    /// No session with this id.
    #[error("unknown session {0}")]
    SessionNotFound(String),

    /// Session id already taken.
    #[error("duplicate session {0}")]
    SessionExists(String),

    /// The session is terminal and accepts no more events.
    #[error("session {0} is closed")]
    SessionClosed(String),

    /// No workflow with this id.
    #[error("unknown workflow {0}")]
    WorkflowNotFound(String),

    /// Workflow id already taken.
    #[error("duplicate workflow {0}")]
    WorkflowExists(String),

    /// No checkpoint with this id.
    #[error("unknown checkpoint {0}")]
    CheckpointNotFound(String),

    /// Status change rejected because the session is already terminal.
    #[error("session {session_id} is {from}, refusing {to}")]
    InvalidTransition {
        /// Session.
        session_id: String,
        /// Stored status.
        from: String,
        /// Requested status.
        to: String,
    },
}

impl EventStoreError {
    /// Whether this is a missing-row outcome rather than a storage fault.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound(_) | Self::WorkflowNotFound(_) | Self::CheckpointNotFound(_)
        )
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, EventStoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_messages_name_the_id() {
        assert_eq!(EventStoreError::SessionNotFound("s-1".into()).to_string(), "unknown session s-1");
        assert_eq!(EventStoreError::SessionClosed("s-1".into()).to_string(), "session s-1 is closed");
        let err = EventStoreError::InvalidTransition {
            session_id: "s-1".into(),
            from: "complete".into(),
            to: "running".into(),
        };
        assert_eq!(err.to_string(), "session s-1 is complete, refusing running");
    }

    #[test]
    fn not_found_covers_every_lookup() {
        assert!(EventStoreError::SessionNotFound("s".into()).is_not_found());
        assert!(EventStoreError::WorkflowNotFound("w".into()).is_not_found());
        assert!(EventStoreError::CheckpointNotFound("c".into()).is_not_found());
        assert!(!EventStoreError::SessionExists("s".into()).is_not_found());
        assert!(!EventStoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows).is_not_found());
    }

    #[test]
    fn json_failures_convert() {
        let err: EventStoreError = serde_json::from_str::<String>("bad").unwrap_err().into();
        assert!(matches!(err, EventStoreError::Serde(_)));
        assert!(err.to_string().starts_with("json column"));
    }
}
