//! Session repository.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::SessionRow;

const COLUMNS: &str = "id, owner_id, workflow_id, status, last_event_id, created_at, updated_at";

/// Session repository. Stateless; every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new `running` session. Returns `false` if the id is taken.
    pub fn insert(
        conn: &Connection,
        id: &str,
        owner_id: &str,
        workflow_id: Option<&str>,
        now: &str,
    ) -> Result<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO sessions (id, owner_id, workflow_id, status, last_event_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'running', 0, ?4, ?4)",
            params![id, owner_id, workflow_id, now],
        )?;
        Ok(changed == 1)
    }

    /// Fetch a session by id.
    pub fn get_by_id(conn: &Connection, id: &str) -> Result<Option<SessionRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM sessions WHERE id = ?1"),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Advance the event high-water mark.
    pub fn bump_last_event_id(conn: &Connection, id: &str, event_id: i64, now: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE sessions SET last_event_id = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, event_id, now],
        )?;
        Ok(changed == 1)
    }

    /// Overwrite the status column.
    pub fn update_status(conn: &Connection, id: &str, status: &str, now: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE sessions SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, now],
        )?;
        Ok(changed == 1)
    }

    /// `running` sessions created strictly before `cutoff`.
    pub fn list_running_created_before(conn: &Connection, cutoff: &str) -> Result<Vec<SessionRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM sessions
             WHERE status = 'running' AND created_at < ?1
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt
            .query_map(params![cutoff], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Delete terminal sessions last written strictly before `cutoff`.
    ///
    /// Events go with them via `ON DELETE CASCADE`.
    pub fn delete_terminal_updated_before(conn: &Connection, cutoff: &str) -> Result<usize> {
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE status IN ('complete', 'error') AND updated_at < ?1",
            params![cutoff],
        )?;
        Ok(deleted)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<SessionRow> {
        Ok(SessionRow {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            workflow_id: row.get(2)?,
            status: row.get(3)?,
            last_event_id: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }
}
