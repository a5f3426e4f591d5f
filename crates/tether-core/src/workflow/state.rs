//! The workflow graph: typed blocks with positions, edges between block
//! ports, and loop/parallel groupings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::BlockId;

fn default_true() -> bool {
    true
}

/// Canvas position of a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

/// A typed node in the workflow graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    /// Block identifier.
    pub id: BlockId,
    /// Block type (e.g. `agent`, `api`, `condition`).
    #[serde(rename = "type")]
    pub block_type: String,
    /// Display name.
    pub name: String,
    /// Canvas position.
    pub position: Position,
    /// Configured inputs keyed by sub-block id.
    #[serde(default)]
    pub sub_blocks: BTreeMap<String, Value>,
    /// Whether the block participates in execution.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Enclosing loop/parallel container, if nested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<BlockId>,
}

/// A directed connection between two block ports.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    /// Edge identifier.
    pub id: String,
    /// Source block.
    pub source: BlockId,
    /// Source port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Target block.
    pub target: BlockId,
    /// Target port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

/// A loop grouping, keyed by its container block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loop {
    /// Container block id.
    pub id: BlockId,
    /// Member blocks.
    pub nodes: Vec<BlockId>,
    /// Iteration count.
    pub iterations: u32,
    /// `for` or `forEach`.
    pub loop_type: String,
}

/// A parallel grouping, keyed by its container block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parallel {
    /// Container block id.
    pub id: BlockId,
    /// Member blocks.
    pub nodes: Vec<BlockId>,
    /// Number of parallel branches.
    pub count: u32,
}

/// Complete persisted state of one workflow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    /// Blocks keyed by id.
    #[serde(default)]
    pub blocks: BTreeMap<BlockId, Block>,
    /// Edges.
    #[serde(default)]
    pub edges: Vec<Edge>,
    /// Loop groupings keyed by container id.
    #[serde(default)]
    pub loops: BTreeMap<BlockId, Loop>,
    /// Parallel groupings keyed by container id.
    #[serde(default)]
    pub parallels: BTreeMap<BlockId, Parallel>,
    /// Deployment flag.
    #[serde(default)]
    pub is_deployed: bool,
}

/// Id-free canonical form of a workflow, for comparing graphs that differ
/// only by identifier renaming.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkflowShape {
    blocks: Vec<String>,
    edges: Vec<String>,
    groups: Vec<String>,
    is_deployed: bool,
}

impl WorkflowState {
    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Canonical shape with every id replaced by the block's type and name.
    pub fn shape(&self) -> WorkflowShape {
        let label = |id: &BlockId| {
            self.blocks.get(id).map_or_else(
                || format!("?{id}"),
                |b| format!("{}:{}", b.block_type, b.name),
            )
        };

        let mut blocks: Vec<String> = self
            .blocks
            .values()
            .map(|b| {
                let parent = b.parent_id.as_ref().map(&label).unwrap_or_default();
                let inputs = serde_json::to_string(&b.sub_blocks).unwrap_or_default();
                format!(
                    "{}:{}@{},{}|{}|{}|{}",
                    b.block_type, b.name, b.position.x, b.position.y, b.enabled, parent, inputs
                )
            })
            .collect();
        blocks.sort();

        let mut edges: Vec<String> = self
            .edges
            .iter()
            .map(|e| {
                format!(
                    "{}[{}]->{}[{}]",
                    label(&e.source),
                    e.source_handle.as_deref().unwrap_or(""),
                    label(&e.target),
                    e.target_handle.as_deref().unwrap_or("")
                )
            })
            .collect();
        edges.sort();

        let mut groups: Vec<String> = Vec::new();
        for lp in self.loops.values() {
            let mut members: Vec<String> = lp.nodes.iter().map(&label).collect();
            members.sort();
            groups.push(format!(
                "loop {} {}x{} [{}]",
                label(&lp.id),
                lp.loop_type,
                lp.iterations,
                members.join(",")
            ));
        }
        for par in self.parallels.values() {
            let mut members: Vec<String> = par.nodes.iter().map(&label).collect();
            members.sort();
            groups.push(format!(
                "parallel {} x{} [{}]",
                label(&par.id),
                par.count,
                members.join(",")
            ));
        }
        groups.sort();

        WorkflowShape {
            blocks,
            edges,
            groups,
            is_deployed: self.is_deployed,
        }
    }

    /// Whether `other` is this graph up to identifier renaming.
    pub fn is_equivalent_to(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn block(id: &str, ty: &str, name: &str) -> Block {
        Block {
            id: BlockId::from(id),
            block_type: ty.into(),
            name: name.into(),
            position: Position { x: 0.0, y: 0.0 },
            sub_blocks: BTreeMap::new(),
            enabled: true,
            parent_id: None,
        }
    }

    pub(crate) fn edge(id: &str, from: &str, to: &str) -> Edge {
        Edge {
            id: id.into(),
            source: BlockId::from(from),
            source_handle: None,
            target: BlockId::from(to),
            target_handle: None,
        }
    }

    pub(crate) fn three_block_workflow() -> WorkflowState {
        let mut state = WorkflowState::default();
        for b in [
            block("a", "starter", "Start"),
            block("b", "agent", "Agent 1"),
            block("c", "api", "API 1"),
        ] {
            let _ = state.blocks.insert(b.id.clone(), b);
        }
        state.edges = vec![edge("e1", "a", "b"), edge("e2", "b", "c")];
        state
    }

    #[test]
    fn counts() {
        let s = three_block_workflow();
        assert_eq!(s.block_count(), 3);
        assert_eq!(s.edge_count(), 2);
    }

    #[test]
    fn renamed_ids_are_equivalent() {
        let a = three_block_workflow();
        let mut b = WorkflowState::default();
        for blk in [
            block("x", "starter", "Start"),
            block("y", "agent", "Agent 1"),
            block("z", "api", "API 1"),
        ] {
            let _ = b.blocks.insert(blk.id.clone(), blk);
        }
        b.edges = vec![edge("q1", "x", "y"), edge("q2", "y", "z")];
        assert!(a.is_equivalent_to(&b));
    }

    #[test]
    fn different_edges_are_not_equivalent() {
        let a = three_block_workflow();
        let mut b = three_block_workflow();
        b.edges.pop();
        assert!(!a.is_equivalent_to(&b));
    }

    #[test]
    fn block_serializes_type_field() {
        let b = block("a", "agent", "A");
        let v = serde_json::to_value(&b).unwrap();
        assert_eq!(v["type"], "agent");
        assert!(v.get("parentId").is_none());
    }

    #[test]
    fn enabled_defaults_to_true() {
        let b: Block = serde_json::from_value(serde_json::json!({
            "id": "a", "type": "agent", "name": "A", "position": {"x": 1.0, "y": 2.0}
        }))
        .unwrap();
        assert!(b.enabled);
        assert!(b.sub_blocks.is_empty());
    }
}
