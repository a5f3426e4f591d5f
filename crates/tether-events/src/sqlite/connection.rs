//! Pooled `SQLite` connections.
//!
//! Every connection handed out by the pool has run [`ConnectionConfig`]'s
//! pragmas: WAL journal, enforced foreign keys, a busy timeout so concurrent
//! writers queue instead of failing, and `synchronous = NORMAL`.

use std::time::Duration;

use r2d2::{CustomizeConnection, Pool};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// Shared pool type used by every store.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A connection checked out of [`ConnectionPool`].
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool sizing and per-connection pragmas.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Upper bound on open connections for file databases.
    pub pool_size: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout: Duration,
    /// Page cache per connection, KiB.
    pub cache_size_kib: u32,
    /// How long `pool.get()` waits for a free connection.
    pub checkout_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 16,
            busy_timeout: Duration::from_secs(5),
            cache_size_kib: 8 * 1024,
            checkout_timeout: Duration::from_secs(5),
        }
    }
}

impl ConnectionConfig {
    fn pragma_batch(&self) -> String {
        // Negative cache_size is in KiB rather than pages.
        format!(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = {};
             PRAGMA cache_size = -{};",
            self.busy_timeout.as_millis(),
            self.cache_size_kib
        )
    }
}

#[derive(Debug)]
struct ApplyPragmas(String);

impl CustomizeConnection<Connection, rusqlite::Error> for ApplyPragmas {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&self.0)
    }
}

fn open(manager: SqliteConnectionManager, max_size: u32, config: &ConnectionConfig) -> Result<ConnectionPool> {
    Ok(Pool::builder()
        .max_size(max_size)
        .connection_timeout(config.checkout_timeout)
        .connection_customizer(Box::new(ApplyPragmas(config.pragma_batch())))
        .build(manager)?)
}

/// Pool over a private in-memory database.
///
/// Each in-memory connection is a separate database, so `pool_size` is
/// ignored and the pool holds one connection.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    open(SqliteConnectionManager::memory(), 1, config)
}

/// Pool over the database file at `path`, created if missing.
pub fn new_file(path: &str, config: &ConnectionConfig) -> Result<ConnectionPool> {
    open(SqliteConnectionManager::file(path), config.pool_size, config)
}
