//! Mailbox backed by the `tool_decisions` table, shared across processes
//! that point at the same database.

use std::time::Duration;

use async_trait::async_trait;
use tether_core::{DecisionStatus, ToolCallId};
use tether_events::{Decision, DecisionStore};

use super::Mailbox;
use crate::errors::MailboxError;

/// Durable mailbox over [`DecisionStore`].
pub struct SqliteMailbox {
    store: DecisionStore,
    ttl: Duration,
}

impl SqliteMailbox {
    /// Create a mailbox whose entries live for `ttl`.
    pub fn new(store: DecisionStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }
}

#[async_trait]
impl Mailbox for SqliteMailbox {
    async fn record_decision(
        &self,
        tool_call_id: &ToolCallId,
        status: DecisionStatus,
        message: Option<&str>,
    ) -> Result<(), MailboxError> {
        Ok(self.store.record(tool_call_id, status, message, self.ttl)?)
    }

    async fn poll_decision(&self, tool_call_id: &ToolCallId) -> Result<Option<Decision>, MailboxError> {
        Ok(self.store.poll(tool_call_id)?)
    }

    async fn purge_expired(&self) -> Result<usize, MailboxError> {
        Ok(self.store.purge_expired()?)
    }
}
