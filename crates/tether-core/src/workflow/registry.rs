//! Registry of block types this deployment knows how to render and run.

use std::collections::BTreeSet;

/// Block types registered when no explicit list is configured.
pub const DEFAULT_BLOCK_TYPES: &[&str] = &[
    "starter",
    "agent",
    "api",
    "condition",
    "evaluator",
    "function",
    "router",
    "response",
    "loop",
    "parallel",
    "webhook",
    "schedule",
    "knowledge",
    "memory",
    "workflow",
];

/// Set of known block types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockRegistry {
    known: BTreeSet<String>,
}

impl BlockRegistry {
    /// Build a registry from an explicit list.
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: types.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `block_type` is registered.
    pub fn is_known(&self, block_type: &str) -> bool {
        self.known.contains(block_type)
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_BLOCK_TYPES.iter().copied())
    }
}
