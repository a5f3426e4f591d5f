//! Typed identifiers.
//!
//! Every id is an [`Id`] tagged with the entity it names, so a workflow id
//! cannot be passed where a checkpoint id is expected. Ids are opaque
//! strings on the wire: generated ones are UUID v7 (time-ordered), and
//! caller-assigned ones (a client-chosen stream id, a tool call id from the
//! model layer, block ids inside a snapshot) are kept verbatim.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque string id for entities of kind `K`.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<K> {
    value: String,
    #[serde(skip)]
    kind: PhantomData<fn() -> K>,
}

impl<K> Id<K> {
    /// Generate a fresh UUID v7 id.
    #[must_use]
    pub fn new() -> Self {
        Self::from(Uuid::now_v7().to_string())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// The owned string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.value
    }
}

impl<K> Default for Id<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> From<String> for Id<K> {
    fn from(value: String) -> Self {
        Self {
            value,
            kind: PhantomData,
        }
    }
}

impl<K> From<&str> for Id<K> {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl<K> From<Id<K>> for String {
    fn from(id: Id<K>) -> Self {
        id.value
    }
}

impl<K> std::ops::Deref for Id<K> {
    type Target = str;
    fn deref(&self) -> &str {
        &self.value
    }
}

impl<K> AsRef<str> for Id<K> {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

// Manual impls so the marker type needs no bounds.

impl<K> Clone for Id<K> {
    fn clone(&self) -> Self {
        Self::from(self.value.clone())
    }
}

impl<K> PartialEq for Id<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<K> Eq for Id<K> {}

impl<K> PartialOrd for Id<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Id<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl<K> Hash for Id<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<K> fmt::Display for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<K> fmt::Debug for Id<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}

/// Kind markers.
pub mod kind {
    /// A copilot session (stream).
    pub enum Session {}
    /// A tool call proposed by the model; keys the decision mailbox.
    pub enum ToolCall {}
    /// A workflow graph.
    pub enum Workflow {}
    /// A checkpoint snapshot.
    pub enum Checkpoint {}
    /// A block inside a workflow graph.
    pub enum Block {}
}

/// Session id. May be caller-assigned.
pub type SessionId = Id<kind::Session>;
/// Tool call id.
pub type ToolCallId = Id<kind::ToolCall>;
/// Workflow id.
pub type WorkflowId = Id<kind::Workflow>;
/// Checkpoint id.
pub type CheckpointId = Id<kind::Checkpoint>;
/// Block id.
pub type BlockId = Id<kind::Block>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_are_v7_and_distinct() {
        let a = SessionId::new();
        let b = SessionId::default();
        assert_ne!(a, b);
        let parsed = Uuid::parse_str(a.as_str()).unwrap();
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn caller_assigned_id_is_kept_verbatim() {
        let id = SessionId::from("stream-from-client");
        assert_eq!(id.as_str(), "stream-from-client");
        assert_eq!(format!("{id} {id:?}"), "stream-from-client \"stream-from-client\"");
    }

    #[test]
    fn wire_form_is_a_bare_string() {
        let id = CheckpointId::from("cp-9");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"cp-9\"");
        let back: CheckpointId = serde_json::from_str("\"cp-9\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn usable_as_map_key() {
        let set: HashSet<BlockId> = ["a", "b", "a"].into_iter().map(BlockId::from).collect();
        assert_eq!(set.len(), 2);
        assert!(BlockId::from("a") < BlockId::from("b"));
    }

    #[test]
    fn converts_back_to_string() {
        let s: String = ToolCallId::from("call_1").into();
        assert_eq!(s, "call_1");
        assert!(!WorkflowId::from("wf").is_empty());
    }
}
