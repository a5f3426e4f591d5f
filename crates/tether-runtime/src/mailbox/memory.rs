//! Process-local mailbox.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use tether_core::{DecisionStatus, ToolCallId};
use tether_events::Decision;
use tokio::time::Instant;
use tracing::debug;

use super::Mailbox;
use crate::errors::MailboxError;

struct Entry {
    decision: Decision,
    expires_at: Instant,
}

/// In-memory mailbox for single-process deployments and tests.
///
/// Expiry uses the tokio clock, so paused-time tests can advance past it.
pub struct MemoryMailbox {
    entries: DashMap<ToolCallId, Entry>,
    ttl: Duration,
}

impl MemoryMailbox {
    /// Create a mailbox whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Mailbox for MemoryMailbox {
    async fn record_decision(
        &self,
        tool_call_id: &ToolCallId,
        status: DecisionStatus,
        message: Option<&str>,
    ) -> Result<(), MailboxError> {
        let decision = Decision {
            tool_call_id: tool_call_id.clone(),
            status,
            message: message.map(str::to_string),
            decided_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let _ = self.entries.insert(
            tool_call_id.clone(),
            Entry {
                decision,
                expires_at: Instant::now() + self.ttl,
            },
        );
        debug!(tool_call_id = %tool_call_id, %status, "decision recorded");
        Ok(())
    }

    async fn poll_decision(&self, tool_call_id: &ToolCallId) -> Result<Option<Decision>, MailboxError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(tool_call_id)
            .filter(|e| e.expires_at > now)
            .map(|e| e.decision.clone());
        Ok(live)
    }

    async fn purge_expired(&self) -> Result<usize, MailboxError> {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.expires_at > now);
        Ok(before.saturating_sub(self.entries.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ToolCallId {
        ToolCallId::from(s)
    }

    #[tokio::test(start_paused = true)]
    async fn none_then_some_then_expired() {
        let mb = MemoryMailbox::new(Duration::from_secs(30));
        assert!(mb.poll_decision(&id("t1")).await.unwrap().is_none());

        mb.record_decision(&id("t1"), DecisionStatus::Accepted, None)
            .await
            .unwrap();
        let d = mb.poll_decision(&id("t1")).await.unwrap().unwrap();
        assert_eq!(d.status, DecisionStatus::Accepted);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(mb.poll_decision(&id("t1")).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn rerecord_refreshes_ttl() {
        let mb = MemoryMailbox::new(Duration::from_secs(10));
        mb.record_decision(&id("t1"), DecisionStatus::Rejected, Some("no"))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        mb.record_decision(&id("t1"), DecisionStatus::Accepted, None)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(8)).await;
        let d = mb.poll_decision(&id("t1")).await.unwrap().unwrap();
        assert_eq!(d.status, DecisionStatus::Accepted);
        assert!(d.message.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_only_expired() {
        let mb = MemoryMailbox::new(Duration::from_secs(10));
        mb.record_decision(&id("old"), DecisionStatus::Accepted, None)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        mb.record_decision(&id("new"), DecisionStatus::Accepted, None)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;

        assert_eq!(mb.purge_expired().await.unwrap(), 1);
        assert_eq!(mb.len(), 1);
        assert!(mb.poll_decision(&id("new")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let mb = MemoryMailbox::new(Duration::from_secs(10));
        mb.record_decision(&id("a"), DecisionStatus::Background, None)
            .await
            .unwrap();
        assert!(mb.poll_decision(&id("b")).await.unwrap().is_none());
    }
}
