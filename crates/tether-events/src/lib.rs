//! # tether-events
//!
//! `SQLite` persistence for the copilot subsystem.
//!
//! - **Event log**: per-session, append-only, strictly ordered event log with session metadata
//! - **Tool decisions**: TTL'd decision records backing the durable mailbox
//! - **Workflows**: transactional whole-graph replace for blocks, edges, loops and parallels
//! - **Checkpoints**: stored workflow snapshots with listing and rename
//! - **Migrations**: version-tracked SQL schema evolution

#![deny(unsafe_code)]

pub mod errors;
pub mod sqlite;
pub mod store;
pub mod types;

pub use errors::{EventStoreError, Result};
pub use sqlite::{ConnectionConfig, ConnectionPool, new_file, new_in_memory, run_migrations};
pub use store::{DecisionStore, EventStore, WorkflowStore};
pub use types::{Checkpoint, CheckpointSummary, Decision, LoggedEvent, NewCheckpoint, SessionMeta};
