//! Checkpoint repository.

use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::errors::Result;
use crate::sqlite::row_types::CheckpointRow;

const COLUMNS: &str = "id, workflow_id, owner_id, snapshot, name, description, created_at";

/// Checkpoint repository. Stateless; every method takes `&Connection`.
pub struct CheckpointRepo;

impl CheckpointRepo {
    /// Insert a checkpoint.
    pub fn insert(conn: &Connection, row: &CheckpointRow) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO checkpoints (id, workflow_id, owner_id, snapshot, name, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.id,
                row.workflow_id,
                row.owner_id,
                row.snapshot,
                row.name,
                row.description,
                row.created_at
            ],
        )?;
        Ok(())
    }

    /// Fetch a checkpoint by id.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<CheckpointRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM checkpoints WHERE id = ?1"),
                params![id],
                Self::map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Checkpoints of a workflow, newest first.
    pub fn list_by_workflow(conn: &Connection, workflow_id: &str) -> Result<Vec<CheckpointRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLUMNS} FROM checkpoints WHERE workflow_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))?;
        let rows = stmt
            .query_map(params![workflow_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Update display metadata. `None` leaves a column unchanged.
    pub fn update_meta(
        conn: &Connection,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE checkpoints
             SET name = COALESCE(?2, name), description = COALESCE(?3, description)
             WHERE id = ?1",
            params![id, name, description],
        )?;
        Ok(changed == 1)
    }

    fn map_row(row: &Row<'_>) -> rusqlite::Result<CheckpointRow> {
        Ok(CheckpointRow {
            id: row.get(0)?,
            workflow_id: row.get(1)?,
            owner_id: row.get(2)?,
            snapshot: row.get(3)?,
            name: row.get(4)?,
            description: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
