//! Durable side of the tool-call mailbox.

use std::time::Duration;

use chrono::Utc;
use tether_core::{DecisionStatus, ToolCallId};
use tracing::debug;

use super::now_rfc3339;
use crate::errors::Result;
use crate::sqlite::connection::{ConnectionPool, PooledConnection};
use crate::sqlite::repositories::decision::DecisionRepo;
use crate::sqlite::row_types::DecisionRow;
use crate::types::Decision;

/// TTL'd decision table keyed by tool call id.
///
/// Expiry is evaluated at read time against the wall clock; expired rows
/// are invisible and removed by [`DecisionStore::purge_expired`].
#[derive(Clone)]
pub struct DecisionStore {
    pool: ConnectionPool,
}

impl DecisionStore {
    /// Create a store over an already-migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    /// Record (or overwrite) a decision that stays visible for `ttl`.
    pub fn record(
        &self,
        tool_call_id: &ToolCallId,
        status: DecisionStatus,
        message: Option<&str>,
        ttl: Duration,
    ) -> Result<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let conn = self.conn()?;
        DecisionRepo::upsert(
            &conn,
            &DecisionRow {
                tool_call_id: tool_call_id.to_string(),
                status: status.as_str().to_string(),
                message: message.map(str::to_string),
                decided_at: now_rfc3339(),
                expires_at_ms: now_ms().saturating_add(ttl_ms),
            },
        )?;
        debug!(tool_call_id = %tool_call_id, %status, "decision recorded");
        Ok(())
    }

    /// The unexpired decision for a tool call, if any.
    pub fn poll(&self, tool_call_id: &ToolCallId) -> Result<Option<Decision>> {
        let conn = self.conn()?;
        DecisionRepo::get_live(&conn, tool_call_id.as_str(), now_ms())?
            .map(Decision::try_from)
            .transpose()
    }

    /// Delete expired decisions.
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.conn()?;
        DecisionRepo::delete_expired(&conn, now_ms())
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::connection::{self, ConnectionConfig};
    use crate::sqlite::migrations::run_migrations;

    fn setup() -> DecisionStore {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        DecisionStore::new(pool)
    }

    #[test]
    fn none_before_record() {
        let store = setup();
        assert!(store.poll(&ToolCallId::from("call_1")).unwrap().is_none());
    }

    #[test]
    fn record_then_poll() {
        let store = setup();
        let id = ToolCallId::from("call_1");
        store
            .record(&id, DecisionStatus::Rejected, Some("no thanks"), Duration::from_secs(60))
            .unwrap();
        let d = store.poll(&id).unwrap().unwrap();
        assert_eq!(d.status, DecisionStatus::Rejected);
        assert_eq!(d.message.as_deref(), Some("no thanks"));
    }

    #[test]
    fn zero_ttl_is_immediately_invisible() {
        let store = setup();
        let id = ToolCallId::from("call_1");
        store
            .record(&id, DecisionStatus::Accepted, None, Duration::ZERO)
            .unwrap();
        assert!(store.poll(&id).unwrap().is_none());
        assert_eq!(store.purge_expired().unwrap(), 1);
    }

    #[test]
    fn huge_ttl_saturates() {
        let store = setup();
        let id = ToolCallId::from("call_1");
        store
            .record(&id, DecisionStatus::Background, None, Duration::MAX)
            .unwrap();
        assert!(store.poll(&id).unwrap().is_some());
    }
}
