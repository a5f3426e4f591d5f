//! Checkpoint & revert: snapshot a workflow before agent mutations and
//! restore it later as a hard reset.

pub mod manager;
pub mod notifier;
pub mod rebuild;

pub use manager::{CheckpointManager, CheckpointMeta, RevertOutcome};
pub use notifier::{NoopNotifier, REASON_AGENT_EDIT, REASON_REVERT, WorkflowNotifier, WorkflowReset};
pub use rebuild::{Rebuilt, rebuild_with_fresh_ids};
