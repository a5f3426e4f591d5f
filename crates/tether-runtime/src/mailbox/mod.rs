//! Tool-call mailbox: hands a human decision from the confirmation request
//! to the suspended orchestrator.
//!
//! Entries are keyed by tool call id and expire after a fixed TTL. An
//! expired entry reads exactly like one that was never written.

mod memory;
mod sqlite;

pub use memory::MemoryMailbox;
pub use sqlite::SqliteMailbox;

use async_trait::async_trait;
use tether_core::{DecisionStatus, ToolCallId};
use tether_events::Decision;

use crate::errors::MailboxError;

/// TTL'd decision handoff.
#[async_trait]
pub trait Mailbox: Send + Sync {
    /// Record (or overwrite) the decision for a tool call.
    async fn record_decision(
        &self,
        tool_call_id: &ToolCallId,
        status: DecisionStatus,
        message: Option<&str>,
    ) -> Result<(), MailboxError>;

    /// The live decision for a tool call, or `None`.
    async fn poll_decision(&self, tool_call_id: &ToolCallId) -> Result<Option<Decision>, MailboxError>;

    /// Drop expired entries. Returns how many were removed.
    async fn purge_expired(&self) -> Result<usize, MailboxError>;
}
