//! Tool-call decision repository.

use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::Result;
use crate::sqlite::row_types::DecisionRow;

/// Decision repository. Stateless; every method takes `&Connection`.
pub struct DecisionRepo;

impl DecisionRepo {
    /// Insert or overwrite the decision for a tool call.
    pub fn upsert(conn: &Connection, row: &DecisionRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO tool_decisions (tool_call_id, status, message, decided_at, expires_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (tool_call_id) DO UPDATE SET
               status = excluded.status,
               message = excluded.message,
               decided_at = excluded.decided_at,
               expires_at_ms = excluded.expires_at_ms",
            params![
                row.tool_call_id,
                row.status,
                row.message,
                row.decided_at,
                row.expires_at_ms
            ],
        )?;
        Ok(())
    }

    /// Unexpired decision for a tool call as of `now_ms`.
    pub fn get_live(conn: &Connection, tool_call_id: &str, now_ms: i64) -> Result<Option<DecisionRow>> {
        let row = conn
            .query_row(
                "SELECT tool_call_id, status, message, decided_at, expires_at_ms
                 FROM tool_decisions WHERE tool_call_id = ?1 AND expires_at_ms > ?2",
                params![tool_call_id, now_ms],
                |row| {
                    Ok(DecisionRow {
                        tool_call_id: row.get(0)?,
                        status: row.get(1)?,
                        message: row.get(2)?,
                        decided_at: row.get(3)?,
                        expires_at_ms: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Delete decisions expired as of `now_ms`.
    pub fn delete_expired(conn: &Connection, now_ms: i64) -> Result<usize> {
        let n = conn.execute(
            "DELETE FROM tool_decisions WHERE expires_at_ms <= ?1",
            params![now_ms],
        )?;
        Ok(n)
    }
}
