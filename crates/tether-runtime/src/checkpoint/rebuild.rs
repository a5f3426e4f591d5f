//! Rebuild a parsed snapshot into a fresh graph with new identifiers.

use std::collections::HashMap;

use tether_core::BlockId;
use tether_core::workflow::{Block, BlockRegistry, Edge, Loop, Parallel, WorkflowState};

/// A rebuilt graph plus every non-fatal problem found on the way.
#[derive(Clone, Debug)]
pub struct Rebuilt {
    /// Graph ready to persist. Shares no block or edge id with the input.
    pub state: WorkflowState,
    /// Human-readable descriptions of skipped blocks and dropped edges or
    /// group members.
    pub warnings: Vec<String>,
}

/// Assign a new id to every block of a known type and rewrite all
/// references through the old-to-new mapping.
///
/// Blocks of unknown type are skipped. Edges, parent links and group
/// members that point at a skipped or missing block are dropped. Each skip
/// or drop adds one warning.
pub fn rebuild_with_fresh_ids(snapshot: &WorkflowState, registry: &BlockRegistry) -> Rebuilt {
    let mut warnings = Vec::new();
    let mut mapping: HashMap<&BlockId, BlockId> = HashMap::new();

    for block in snapshot.blocks.values() {
        if registry.is_known(&block.block_type) {
            let _ = mapping.insert(&block.id, BlockId::new());
        } else {
            warnings.push(format!(
                "skipped block '{}' ({}): unknown block type '{}'",
                block.name, block.id, block.block_type
            ));
        }
    }

    let mut state = WorkflowState {
        is_deployed: snapshot.is_deployed,
        ..WorkflowState::default()
    };

    for block in snapshot.blocks.values() {
        let Some(new_id) = mapping.get(&block.id) else {
            continue;
        };
        let parent_id = match &block.parent_id {
            None => None,
            Some(parent) => {
                let mapped = mapping.get(parent).cloned();
                if mapped.is_none() {
                    warnings.push(format!(
                        "detached block '{}' ({}): parent {parent} no longer resolves",
                        block.name, block.id
                    ));
                }
                mapped
            }
        };
        let rebuilt = Block {
            id: new_id.clone(),
            parent_id,
            ..block.clone()
        };
        let _ = state.blocks.insert(new_id.clone(), rebuilt);
    }

    for edge in &snapshot.edges {
        match (mapping.get(&edge.source), mapping.get(&edge.target)) {
            (Some(source), Some(target)) => state.edges.push(Edge {
                id: uuid::Uuid::now_v7().to_string(),
                source: source.clone(),
                source_handle: edge.source_handle.clone(),
                target: target.clone(),
                target_handle: edge.target_handle.clone(),
            }),
            _ => warnings.push(format!(
                "dropped edge {} ({} -> {}): endpoint no longer resolves",
                edge.id, edge.source, edge.target
            )),
        }
    }

    for lp in snapshot.loops.values() {
        let Some(container) = mapping.get(&lp.id) else {
            warnings.push(format!("dropped loop {}: container block no longer resolves", lp.id));
            continue;
        };
        let nodes = remap_members(&mapping, &lp.nodes, "loop", &lp.id, &mut warnings);
        let _ = state.loops.insert(
            container.clone(),
            Loop {
                id: container.clone(),
                nodes,
                ..lp.clone()
            },
        );
    }

    for par in snapshot.parallels.values() {
        let Some(container) = mapping.get(&par.id) else {
            warnings.push(format!("dropped parallel {}: container block no longer resolves", par.id));
            continue;
        };
        let nodes = remap_members(&mapping, &par.nodes, "parallel", &par.id, &mut warnings);
        let _ = state.parallels.insert(
            container.clone(),
            Parallel {
                id: container.clone(),
                nodes,
                ..par.clone()
            },
        );
    }

    Rebuilt { state, warnings }
}

fn remap_members(
    mapping: &HashMap<&BlockId, BlockId>,
    members: &[BlockId],
    kind: &str,
    group: &BlockId,
    warnings: &mut Vec<String>,
) -> Vec<BlockId> {
    members
        .iter()
        .filter_map(|m| {
            let mapped = mapping.get(m).cloned();
            if mapped.is_none() {
                warnings.push(format!("dropped member {m} from {kind} {group}: block no longer resolves"));
            }
            mapped
        })
        .collect()
}
