//! Workflow graph persistence and checkpoints.

use tether_core::workflow::{Loop, Parallel, WorkflowState};
use tether_core::{CheckpointId, WorkflowId};
use tracing::{info, instrument};

use super::now_rfc3339;
use crate::errors::{EventStoreError, Result};
use crate::sqlite::connection::{ConnectionPool, PooledConnection};
use crate::sqlite::repositories::checkpoint::CheckpointRepo;
use crate::sqlite::repositories::workflow::{KIND_LOOP, KIND_PARALLEL, WorkflowRepo};
use crate::sqlite::row_types::CheckpointRow;
use crate::types::{Checkpoint, CheckpointSummary, NewCheckpoint};

/// Stores workflow graphs and their checkpoints.
#[derive(Clone)]
pub struct WorkflowStore {
    pool: ConnectionPool,
}

impl WorkflowStore {
    /// Create a store over an already-migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Workflows
    // ─────────────────────────────────────────────────────────────────────

    /// Create a workflow with an initial graph.
    pub fn create_workflow(&self, workflow_id: &WorkflowId, owner_id: &str, state: &WorkflowState) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let now = now_rfc3339();
        if !WorkflowRepo::insert(&tx, workflow_id.as_str(), owner_id, state.is_deployed, &now)? {
            return Err(EventStoreError::WorkflowExists(workflow_id.to_string()));
        }
        Self::write_graph(&tx, workflow_id, state)?;
        tx.commit()?;
        Ok(())
    }

    /// Owner of a workflow, or `None` if it does not exist.
    pub fn workflow_owner(&self, workflow_id: &WorkflowId) -> Result<Option<String>> {
        let conn = self.conn()?;
        Ok(WorkflowRepo::get(&conn, workflow_id.as_str())?.map(|w| w.owner_id))
    }

    /// Load the full persisted graph.
    pub fn load_workflow_state(&self, workflow_id: &WorkflowId) -> Result<WorkflowState> {
        let conn = self.conn()?;
        // One read transaction so the graph is a consistent cut.
        let tx = conn.unchecked_transaction()?;
        let workflow = WorkflowRepo::get(&tx, workflow_id.as_str())?
            .ok_or_else(|| EventStoreError::WorkflowNotFound(workflow_id.to_string()))?;

        let mut state = WorkflowState {
            blocks: WorkflowRepo::list_blocks(&tx, workflow_id.as_str())?,
            edges: WorkflowRepo::list_edges(&tx, workflow_id.as_str())?,
            is_deployed: workflow.is_deployed,
            ..WorkflowState::default()
        };
        for (kind, config) in WorkflowRepo::list_subflows(&tx, workflow_id.as_str())? {
            match kind.as_str() {
                KIND_LOOP => {
                    let lp: Loop = serde_json::from_str(&config)?;
                    let _ = state.loops.insert(lp.id.clone(), lp);
                }
                KIND_PARALLEL => {
                    let par: Parallel = serde_json::from_str(&config)?;
                    let _ = state.parallels.insert(par.id.clone(), par);
                }
                other => {
                    return Err(EventStoreError::Corrupt(format!(
                        "workflow {workflow_id}: unknown subflow kind {other}"
                    )));
                }
            }
        }
        tx.commit()?;
        Ok(state)
    }

    /// Replace the whole persisted graph in one transaction.
    ///
    /// Any failure rolls back, leaving the previous graph untouched.
    #[instrument(skip_all, fields(workflow_id = %workflow_id, blocks = state.block_count()))]
    pub fn replace_workflow_state(&self, workflow_id: &WorkflowId, state: &WorkflowState) -> Result<()> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        if !WorkflowRepo::touch(&tx, workflow_id.as_str(), state.is_deployed, &now_rfc3339())? {
            return Err(EventStoreError::WorkflowNotFound(workflow_id.to_string()));
        }
        WorkflowRepo::clear_graph(&tx, workflow_id.as_str())?;
        Self::write_graph(&tx, workflow_id, state)?;
        tx.commit()?;
        info!("workflow state replaced");
        Ok(())
    }

    fn write_graph(conn: &rusqlite::Connection, workflow_id: &WorkflowId, state: &WorkflowState) -> Result<()> {
        let id = workflow_id.as_str();
        for block in state.blocks.values() {
            WorkflowRepo::insert_block(conn, id, block)?;
        }
        for edge in &state.edges {
            WorkflowRepo::insert_edge(conn, id, edge)?;
        }
        for lp in state.loops.values() {
            WorkflowRepo::insert_loop(conn, id, lp)?;
        }
        for par in state.parallels.values() {
            WorkflowRepo::insert_parallel(conn, id, par)?;
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Checkpoints
    // ─────────────────────────────────────────────────────────────────────

    /// Persist a new checkpoint.
    pub fn insert_checkpoint(&self, new: &NewCheckpoint<'_>) -> Result<Checkpoint> {
        let row = CheckpointRow {
            id: CheckpointId::new().into_inner(),
            workflow_id: new.workflow_id.to_string(),
            owner_id: new.owner_id.to_string(),
            snapshot: new.snapshot.clone(),
            name: new.name.map(str::to_string),
            description: new.description.map(str::to_string),
            created_at: now_rfc3339(),
        };
        let conn = self.conn()?;
        CheckpointRepo::insert(&conn, &row).map_err(|e| match e {
            EventStoreError::Sqlite(rusqlite::Error::SqliteFailure(f, _))
                if f.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                EventStoreError::WorkflowNotFound(new.workflow_id.to_string())
            }
            other => other,
        })?;
        info!(checkpoint_id = %row.id, workflow_id = %row.workflow_id, "checkpoint created");
        Ok(Checkpoint::from(row))
    }

    /// Fetch a checkpoint, or `None`.
    pub fn get_checkpoint(&self, checkpoint_id: &CheckpointId) -> Result<Option<Checkpoint>> {
        let conn = self.conn()?;
        Ok(CheckpointRepo::get(&conn, checkpoint_id.as_str())?.map(Checkpoint::from))
    }

    /// Checkpoints of a workflow, newest first.
    pub fn list_checkpoints(&self, workflow_id: &WorkflowId) -> Result<Vec<CheckpointSummary>> {
        let conn = self.conn()?;
        Ok(CheckpointRepo::list_by_workflow(&conn, workflow_id.as_str())?
            .into_iter()
            .map(|row| CheckpointSummary::from(Checkpoint::from(row)))
            .collect())
    }

    /// Edit a checkpoint's display metadata. `None` leaves a field unchanged.
    pub fn update_checkpoint_meta(
        &self,
        checkpoint_id: &CheckpointId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<CheckpointSummary> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        if !CheckpointRepo::update_meta(&tx, checkpoint_id.as_str(), name, description)? {
            return Err(EventStoreError::CheckpointNotFound(checkpoint_id.to_string()));
        }
        let row = CheckpointRepo::get(&tx, checkpoint_id.as_str())?
            .ok_or_else(|| EventStoreError::CheckpointNotFound(checkpoint_id.to_string()))?;
        tx.commit()?;
        Ok(CheckpointSummary::from(Checkpoint::from(row)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::connection::{self, ConnectionConfig};
    use crate::sqlite::migrations::run_migrations;
    use assert_matches::assert_matches;
    use std::collections::BTreeMap;
    use tether_core::BlockId;
    use tether_core::workflow::{Block, Edge, Position};

    fn setup() -> WorkflowStore {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        WorkflowStore::new(pool)
    }

    fn block(id: &str, ty: &str) -> Block {
        Block {
            id: BlockId::from(id),
            block_type: ty.into(),
            name: id.to_uppercase(),
            position: Position { x: 10.0, y: 20.0 },
            sub_blocks: BTreeMap::new(),
            enabled: true,
            parent_id: None,
        }
    }

    fn edge(id: &str, s: &str, t: &str) -> Edge {
        Edge {
            id: id.into(),
            source: BlockId::from(s),
            source_handle: None,
            target: BlockId::from(t),
            target_handle: None,
        }
    }

    fn sample() -> WorkflowState {
        let mut state = WorkflowState::default();
        for b in [block("a", "starter"), block("b", "loop"), block("c", "agent")] {
            let _ = state.blocks.insert(b.id.clone(), b);
        }
        state.edges = vec![edge("e1", "a", "b"), edge("e2", "b", "c")];
        let _ = state.loops.insert(
            BlockId::from("b"),
            Loop {
                id: BlockId::from("b"),
                nodes: vec![BlockId::from("c")],
                iterations: 2,
                loop_type: "for".into(),
            },
        );
        state
    }

    #[test]
    fn create_and_load_roundtrip() {
        let store = setup();
        let wf = WorkflowId::from("wf");
        store.create_workflow(&wf, "u1", &sample()).unwrap();
        assert_eq!(store.load_workflow_state(&wf).unwrap(), sample());
        assert_eq!(store.workflow_owner(&wf).unwrap().as_deref(), Some("u1"));
    }

    #[test]
    fn load_missing_workflow() {
        let store = setup();
        assert_matches!(
            store.load_workflow_state(&WorkflowId::from("nope")),
            Err(EventStoreError::WorkflowNotFound(_))
        );
    }

    #[test]
    fn replace_swaps_whole_graph() {
        let store = setup();
        let wf = WorkflowId::from("wf");
        store.create_workflow(&wf, "u1", &sample()).unwrap();

        let mut next = WorkflowState::default();
        let _ = next.blocks.insert(BlockId::from("z"), block("z", "api"));
        next.is_deployed = true;
        store.replace_workflow_state(&wf, &next).unwrap();

        assert_eq!(store.load_workflow_state(&wf).unwrap(), next);
    }

    #[test]
    fn failed_replace_leaves_state_untouched() {
        let store = setup();
        let wf = WorkflowId::from("wf");
        store.create_workflow(&wf, "u1", &sample()).unwrap();

        let mut bad = sample();
        bad.edges.push(edge("e1", "c", "a"));
        assert!(store.replace_workflow_state(&wf, &bad).is_err());
        assert_eq!(store.load_workflow_state(&wf).unwrap(), sample());
    }

    #[test]
    fn replace_missing_workflow() {
        let store = setup();
        assert_matches!(
            store.replace_workflow_state(&WorkflowId::from("nope"), &sample()),
            Err(EventStoreError::WorkflowNotFound(_))
        );
    }

    #[test]
    fn checkpoint_lifecycle() {
        let store = setup();
        let wf = WorkflowId::from("wf");
        store.create_workflow(&wf, "u1", &sample()).unwrap();

        let cp = store
            .insert_checkpoint(&NewCheckpoint {
                workflow_id: &wf,
                owner_id: "u1",
                snapshot: "{\"version\":1}".into(),
                name: Some("before"),
                description: None,
            })
            .unwrap();
        let loaded = store.get_checkpoint(&cp.id).unwrap().unwrap();
        assert_eq!(loaded, cp);

        let renamed = store
            .update_checkpoint_meta(&cp.id, Some("renamed"), Some("why"))
            .unwrap();
        assert_eq!(renamed.name.as_deref(), Some("renamed"));
        assert_eq!(
            store.get_checkpoint(&cp.id).unwrap().unwrap().snapshot,
            "{\"version\":1}"
        );

        let listed = store.list_checkpoints(&wf).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, cp.id);
    }

    #[test]
    fn checkpoint_for_unknown_workflow() {
        let store = setup();
        let wf = WorkflowId::from("ghost");
        assert_matches!(
            store.insert_checkpoint(&NewCheckpoint {
                workflow_id: &wf,
                owner_id: "u1",
                snapshot: String::new(),
                name: None,
                description: None,
            }),
            Err(EventStoreError::WorkflowNotFound(_))
        );
    }

    #[test]
    fn rename_missing_checkpoint() {
        let store = setup();
        assert_matches!(
            store.update_checkpoint_meta(&CheckpointId::from("nope"), Some("x"), None),
            Err(EventStoreError::CheckpointNotFound(_))
        );
    }
}
