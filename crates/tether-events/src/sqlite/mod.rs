//! `SQLite` backend.
//!
//! - **[`connection`]**: `r2d2` pool with WAL, foreign keys and busy timeout
//!   applied to every connection.
//! - **[`migrations`]**: embedded, version-tracked schema.
//! - **[`row_types`]**: raw row structs.
//! - **[`repositories`]**: stateless SQL per table.

pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod row_types;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use migrations::{current_version, latest_version, run_migrations};
