//! Workflow graph repository.
//!
//! A workflow is one `workflows` row plus its blocks, edges and subflows
//! (loop/parallel groupings, stored as JSON config).

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension, params};
use tether_core::workflow::{Block, Edge, Loop, Parallel, Position};
use tether_core::BlockId;

use crate::errors::Result;
use crate::sqlite::row_types::WorkflowRow;

/// Kind column for loop subflows.
pub const KIND_LOOP: &str = "loop";
/// Kind column for parallel subflows.
pub const KIND_PARALLEL: &str = "parallel";

/// Workflow repository. Stateless; every method takes `&Connection`.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Insert a workflow row. Returns `false` if the id is taken.
    pub fn insert(conn: &Connection, id: &str, owner_id: &str, is_deployed: bool, now: &str) -> Result<bool> {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO workflows (id, owner_id, is_deployed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![id, owner_id, is_deployed, now],
        )?;
        Ok(changed == 1)
    }

    /// Fetch a workflow row.
    pub fn get(conn: &Connection, id: &str) -> Result<Option<WorkflowRow>> {
        let row = conn
            .query_row(
                "SELECT id, owner_id, is_deployed, created_at, updated_at FROM workflows WHERE id = ?1",
                params![id],
                |row| {
                    Ok(WorkflowRow {
                        id: row.get(0)?,
                        owner_id: row.get(1)?,
                        is_deployed: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Update the deployment flag and touch `updated_at`.
    pub fn touch(conn: &Connection, id: &str, is_deployed: bool, now: &str) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE workflows SET is_deployed = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, is_deployed, now],
        )?;
        Ok(changed == 1)
    }

    /// Remove every block, edge and subflow of a workflow.
    pub fn clear_graph(conn: &Connection, id: &str) -> Result<()> {
        for table in ["workflow_edges", "workflow_subflows", "workflow_blocks"] {
            let _ = conn.execute(
                &format!("DELETE FROM {table} WHERE workflow_id = ?1"),
                params![id],
            )?;
        }
        Ok(())
    }

    /// Insert one block.
    pub fn insert_block(conn: &Connection, workflow_id: &str, block: &Block) -> Result<()> {
        let sub_blocks = serde_json::to_string(&block.sub_blocks)?;
        let _ = conn.execute(
            "INSERT INTO workflow_blocks
               (workflow_id, id, block_type, name, position_x, position_y, sub_blocks, enabled, parent_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                workflow_id,
                block.id.as_str(),
                block.block_type,
                block.name,
                block.position.x,
                block.position.y,
                sub_blocks,
                block.enabled,
                block.parent_id.as_ref().map(BlockId::as_str),
            ],
        )?;
        Ok(())
    }

    /// Insert one edge.
    pub fn insert_edge(conn: &Connection, workflow_id: &str, edge: &Edge) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO workflow_edges (workflow_id, id, source, source_handle, target, target_handle)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                workflow_id,
                edge.id,
                edge.source.as_str(),
                edge.source_handle,
                edge.target.as_str(),
                edge.target_handle,
            ],
        )?;
        Ok(())
    }

    /// Insert one loop grouping.
    pub fn insert_loop(conn: &Connection, workflow_id: &str, lp: &Loop) -> Result<()> {
        Self::insert_subflow(conn, workflow_id, lp.id.as_str(), KIND_LOOP, &serde_json::to_string(lp)?)
    }

    /// Insert one parallel grouping.
    pub fn insert_parallel(conn: &Connection, workflow_id: &str, par: &Parallel) -> Result<()> {
        Self::insert_subflow(conn, workflow_id, par.id.as_str(), KIND_PARALLEL, &serde_json::to_string(par)?)
    }

    fn insert_subflow(conn: &Connection, workflow_id: &str, id: &str, kind: &str, config: &str) -> Result<()> {
        let _ = conn.execute(
            "INSERT INTO workflow_subflows (workflow_id, id, kind, config) VALUES (?1, ?2, ?3, ?4)",
            params![workflow_id, id, kind, config],
        )?;
        Ok(())
    }

    /// All blocks of a workflow, keyed by id.
    pub fn list_blocks(conn: &Connection, workflow_id: &str) -> Result<BTreeMap<BlockId, Block>> {
        let mut stmt = conn.prepare(
            "SELECT id, block_type, name, position_x, position_y, sub_blocks, enabled, parent_id
             FROM workflow_blocks WHERE workflow_id = ?1",
        )?;
        let raw = stmt
            .query_map(params![workflow_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, bool>(6)?,
                    row.get::<_, Option<String>>(7)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut blocks = BTreeMap::new();
        for (id, block_type, name, x, y, sub_blocks, enabled, parent_id) in raw {
            let id = BlockId::from(id);
            let block = Block {
                id: id.clone(),
                block_type,
                name,
                position: Position { x, y },
                sub_blocks: serde_json::from_str(&sub_blocks)?,
                enabled,
                parent_id: parent_id.map(BlockId::from),
            };
            let _ = blocks.insert(id, block);
        }
        Ok(blocks)
    }

    /// All edges of a workflow, in insertion order.
    pub fn list_edges(conn: &Connection, workflow_id: &str) -> Result<Vec<Edge>> {
        let mut stmt = conn.prepare(
            "SELECT id, source, source_handle, target, target_handle
             FROM workflow_edges WHERE workflow_id = ?1 ORDER BY rowid ASC",
        )?;
        let edges = stmt
            .query_map(params![workflow_id], |row| {
                Ok(Edge {
                    id: row.get(0)?,
                    source: BlockId::from(row.get::<_, String>(1)?),
                    source_handle: row.get(2)?,
                    target: BlockId::from(row.get::<_, String>(3)?),
                    target_handle: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Raw `(kind, config)` subflow rows of a workflow.
    pub fn list_subflows(conn: &Connection, workflow_id: &str) -> Result<Vec<(String, String)>> {
        let mut stmt = conn.prepare(
            "SELECT kind, config FROM workflow_subflows WHERE workflow_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![workflow_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
