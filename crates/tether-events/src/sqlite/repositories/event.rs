//! Event repository: the per-session append-only log.
//!
//! Rows are keyed by `(session_id, event_id)`. Ids are assigned by the store
//! from the session's high-water mark, never by this repository.

use rusqlite::{Connection, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::EventRow;

/// Event repository. Stateless; every method takes `&Connection`.
pub struct EventRepo;

impl EventRepo {
    /// Insert one event row.
    pub fn insert(conn: &Connection, row: &EventRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO events (session_id, event_id, event_type, payload, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![row.session_id, row.event_id, row.event_type, row.payload, row.timestamp],
        )?;
        Ok(())
    }

    /// Events with `from < event_id` (and `event_id <= to` when bounded),
    /// ascending.
    pub fn list_range(
        conn: &Connection,
        session_id: &str,
        from: i64,
        to: Option<i64>,
    ) -> Result<Vec<EventRow>> {
        let mut stmt = conn.prepare_cached(
            "SELECT session_id, event_id, event_type, payload, timestamp
             FROM events
             WHERE session_id = ?1 AND event_id > ?2 AND (?3 IS NULL OR event_id <= ?3)
             ORDER BY event_id ASC",
        )?;
        let rows = stmt
            .query_map(params![session_id, from, to], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Number of events stored for a session.
    pub fn count(conn: &Connection, session_id: &str) -> Result<i64> {
        let n = conn.query_row(
            "SELECT COUNT(*) FROM events WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
        Ok(EventRow {
            session_id: row.get(0)?,
            event_id: row.get(1)?,
            event_type: row.get(2)?,
            payload: row.get(3)?,
            timestamp: row.get(4)?,
        })
    }
}
