//! Per-session event log store.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{Transaction, TransactionBehavior};
use tether_core::{CopilotEvent, SessionId, SessionStatus, WorkflowId};
use tracing::{debug, info, instrument};

use super::{cutoff_before, now_rfc3339, rfc3339};
use crate::errors::{EventStoreError, Result};
use crate::sqlite::connection::{ConnectionPool, PooledConnection};
use crate::sqlite::repositories::event::EventRepo;
use crate::sqlite::repositories::session::SessionRepo;
use crate::sqlite::row_types::EventRow;
use crate::types::{LoggedEvent, SessionMeta};

/// Appends read the high-water mark before writing, so take the write lock
/// up front instead of upgrading a deferred transaction.
fn write_tx(conn: &mut PooledConnection) -> Result<Transaction<'_>> {
    Ok(conn.transaction_with_behavior(TransactionBehavior::Immediate)?)
}

/// Append-only, per-session ordered event log plus session metadata.
///
/// Event ids start at 1 and are taken from the session's `last_event_id`
/// high-water mark inside the append transaction, so they stay strictly
/// increasing even if rows are later purged. Reads are pure and may run
/// concurrently with the single writer.
#[derive(Clone)]
pub struct EventStore {
    pool: ConnectionPool,
}

impl EventStore {
    /// Create a store over an already-migrated pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> Result<PooledConnection> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Session lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Create a `running` session.
    ///
    /// Fails with [`EventStoreError::SessionExists`] if the id is taken.
    #[instrument(skip_all, fields(session_id = %session_id, owner_id = %owner_id))]
    pub fn create_session(
        &self,
        session_id: &SessionId,
        owner_id: &str,
        workflow_id: Option<&WorkflowId>,
    ) -> Result<SessionMeta> {
        let conn = self.conn()?;
        let now = now_rfc3339();
        let inserted = SessionRepo::insert(
            &conn,
            session_id.as_str(),
            owner_id,
            workflow_id.map(WorkflowId::as_str),
            &now,
        )?;
        if !inserted {
            return Err(EventStoreError::SessionExists(session_id.to_string()));
        }
        info!("session created");
        Ok(SessionMeta {
            session_id: session_id.clone(),
            owner_id: owner_id.to_string(),
            workflow_id: workflow_id.cloned(),
            status: SessionStatus::Running,
            last_event_id: 0,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Session metadata, or `None` if never created or purged.
    pub fn get_session_meta(&self, session_id: &SessionId) -> Result<Option<SessionMeta>> {
        let conn = self.conn()?;
        SessionRepo::get_by_id(&conn, session_id.as_str())?
            .map(SessionMeta::try_from)
            .transpose()
    }

    /// Change a session's status.
    ///
    /// Moving out of `complete` or `error` fails with
    /// [`EventStoreError::InvalidTransition`]; re-setting the same status is
    /// a no-op.
    pub fn set_status(&self, session_id: &SessionId, status: SessionStatus) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = write_tx(&mut conn)?;
        Self::transition(&tx, session_id, status)?;
        tx.commit()?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Log
    // ─────────────────────────────────────────────────────────────────────

    /// Append an event and return its id.
    ///
    /// Fails with [`EventStoreError::SessionNotFound`] if the session was
    /// never created or has been purged, and with
    /// [`EventStoreError::SessionClosed`] once it is terminal.
    pub fn append_event(&self, session_id: &SessionId, event: &CopilotEvent) -> Result<u64> {
        let mut conn = self.conn()?;
        let tx = write_tx(&mut conn)?;
        let event_id = Self::append_in(&tx, session_id, event)?;
        tx.commit()?;
        debug!(session_id = %session_id, event_id, event_type = event.event_type(), "event appended");
        Ok(event_id)
    }

    /// Append a final event and move to a terminal status in one transaction.
    #[instrument(skip_all, fields(session_id = %session_id, status = %status))]
    pub fn finish_session(
        &self,
        session_id: &SessionId,
        event: &CopilotEvent,
        status: SessionStatus,
    ) -> Result<u64> {
        let mut conn = self.conn()?;
        let tx = write_tx(&mut conn)?;
        let event_id = Self::append_in(&tx, session_id, event)?;
        Self::transition(&tx, session_id, status)?;
        tx.commit()?;
        info!(event_id, "session finished");
        Ok(event_id)
    }

    /// Append an `error` event and mark the session `error`.
    pub fn fail_session(&self, session_id: &SessionId, category: &str, message: &str) -> Result<u64> {
        self.finish_session(
            session_id,
            &CopilotEvent::error(category, message),
            SessionStatus::Error,
        )
    }

    /// Events with `event_id > from`, ascending.
    ///
    /// A `from` past the end yields an empty list. An unknown session also
    /// yields an empty list; callers check metadata for existence.
    pub fn read_events_since(&self, session_id: &SessionId, from: u64) -> Result<Vec<LoggedEvent>> {
        self.read_events_range(session_id, from, None)
    }

    /// Events with `from < event_id <= to` (unbounded when `to` is `None`).
    pub fn read_events_range(
        &self,
        session_id: &SessionId,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<LoggedEvent>> {
        let Ok(from) = i64::try_from(from) else {
            return Ok(Vec::new());
        };
        let to = to.map(|t| i64::try_from(t).unwrap_or(i64::MAX));
        let conn = self.conn()?;
        EventRepo::list_range(&conn, session_id.as_str(), from, to)?
            .into_iter()
            .map(LoggedEvent::try_from)
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Maintenance
    // ─────────────────────────────────────────────────────────────────────

    /// `running` sessions created before `cutoff`.
    pub fn list_running_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<SessionMeta>> {
        let conn = self.conn()?;
        SessionRepo::list_running_created_before(&conn, &rfc3339(cutoff))?
            .into_iter()
            .map(SessionMeta::try_from)
            .collect()
    }

    /// `running` sessions older than `max_age`.
    pub fn list_stale_running(&self, max_age: Duration) -> Result<Vec<SessionMeta>> {
        self.list_running_created_before(cutoff_before(max_age))
    }

    /// Delete terminal sessions (and their events) last written before `cutoff`.
    pub fn purge_terminal_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;
        let purged = SessionRepo::delete_terminal_updated_before(&tx, &rfc3339(cutoff))?;
        tx.commit()?;
        if purged > 0 {
            info!(purged, "purged expired sessions");
        }
        Ok(purged)
    }

    /// Delete terminal sessions idle for longer than `grace`.
    pub fn purge_expired_sessions(&self, grace: Duration) -> Result<usize> {
        self.purge_terminal_before(cutoff_before(grace))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internal
    // ─────────────────────────────────────────────────────────────────────

    fn append_in(conn: &rusqlite::Connection, session_id: &SessionId, event: &CopilotEvent) -> Result<u64> {
        let session = SessionRepo::get_by_id(conn, session_id.as_str())?
            .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;
        if session.status != SessionStatus::Running.as_str() {
            return Err(EventStoreError::SessionClosed(session_id.to_string()));
        }

        let event_id = session.last_event_id + 1;
        let now = now_rfc3339();
        EventRepo::insert(
            conn,
            &EventRow {
                session_id: session.id.clone(),
                event_id,
                event_type: event.event_type().to_string(),
                payload: serde_json::to_string(event)?,
                timestamp: now.clone(),
            },
        )?;
        let _ = SessionRepo::bump_last_event_id(conn, &session.id, event_id, &now)?;
        crate::types::to_event_id(event_id)
    }

    fn transition(conn: &rusqlite::Connection, session_id: &SessionId, next: SessionStatus) -> Result<()> {
        let row = SessionRepo::get_by_id(conn, session_id.as_str())?
            .ok_or_else(|| EventStoreError::SessionNotFound(session_id.to_string()))?;
        let current = SessionMeta::try_from(row)?.status;
        if !current.can_transition_to(next) {
            return Err(EventStoreError::InvalidTransition {
                session_id: session_id.to_string(),
                from: current.to_string(),
                to: next.to_string(),
            });
        }
        if current != next {
            let _ = SessionRepo::update_status(conn, session_id.as_str(), next.as_str(), &now_rfc3339())?;
        }
        Ok(())
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

    fn setup() -> EventStore {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        EventStore::new(pool)
    }

    fn delta(text: &str) -> CopilotEvent {
        CopilotEvent::ContentDelta { text: text.into() }
    }

    // ── Session lifecycle ─────────────────────────────────────────────

    #[test]
    fn create_session_basic() {
        let store = setup();
        let id = SessionId::from("s1");
        let wf = WorkflowId::from("wf");
        let meta = store.create_session(&id, "u1", Some(&wf)).unwrap();
        assert_eq!(meta.status, SessionStatus::Running);
        assert_eq!(meta.last_event_id, 0);

        let loaded = store.get_session_meta(&id).unwrap().unwrap();
        assert_eq!(loaded.owner_id, "u1");
        assert_eq!(loaded.workflow_id, Some(wf));
    }

    #[test]
    fn duplicate_session_rejected() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        assert_matches!(
            store.create_session(&id, "u2", None),
            Err(EventStoreError::SessionExists(s)) if s == "s1"
        );
    }

    #[test]
    fn missing_meta_is_none() {
        let store = setup();
        assert!(store.get_session_meta(&SessionId::from("nope")).unwrap().is_none());
    }

    #[test]
    fn terminal_status_is_final() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        store.set_status(&id, SessionStatus::Complete).unwrap();
        store.set_status(&id, SessionStatus::Complete).unwrap();
        assert_matches!(
            store.set_status(&id, SessionStatus::Running),
            Err(EventStoreError::InvalidTransition { .. })
        );
    }

    #[test]
    fn set_status_unknown_session() {
        let store = setup();
        assert_matches!(
            store.set_status(&SessionId::from("x"), SessionStatus::Error),
            Err(EventStoreError::SessionNotFound(_))
        );
    }

    // ── Append / read ─────────────────────────────────────────────────

    #[test]
    fn ids_start_at_one_and_increase() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        let ids: Vec<u64> = (0..4)
            .map(|i| store.append_event(&id, &delta(&i.to_string())).unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
        assert_eq!(store.get_session_meta(&id).unwrap().unwrap().last_event_id, 4);
    }

    #[test]
    fn append_unknown_session_fails() {
        let store = setup();
        assert_matches!(
            store.append_event(&SessionId::from("ghost"), &delta("x")),
            Err(EventStoreError::SessionNotFound(_))
        );
    }

    #[test]
    fn append_after_terminal_fails() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        let _ = store.fail_session(&id, "upstream", "boom").unwrap();
        assert_matches!(
            store.append_event(&id, &delta("late")),
            Err(EventStoreError::SessionClosed(_))
        );
    }

    #[test]
    fn read_since_is_exclusive() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        for i in 0..5 {
            let _ = store.append_event(&id, &delta(&i.to_string())).unwrap();
        }
        let events = store.read_events_since(&id, 2).unwrap();
        let ids: Vec<u64> = events.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(events[0].payload, delta("2"));
    }

    #[test]
    fn read_past_end_is_empty() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        let _ = store.append_event(&id, &delta("a")).unwrap();
        assert!(store.read_events_since(&id, 10).unwrap().is_empty());
        assert!(store.read_events_since(&id, u64::MAX).unwrap().is_empty());
    }

    #[test]
    fn read_range_bounded() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        for i in 0..5 {
            let _ = store.append_event(&id, &delta(&i.to_string())).unwrap();
        }
        let ids: Vec<u64> = store
            .read_events_range(&id, 1, Some(3))
            .unwrap()
            .iter()
            .map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn finish_session_appends_and_transitions() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        let _ = store.append_event(&id, &delta("a")).unwrap();
        let last = store
            .finish_session(
                &id,
                &CopilotEvent::Summary {
                    text: "done".into(),
                    steps: 1,
                },
                SessionStatus::Complete,
            )
            .unwrap();
        assert_eq!(last, 2);
        let meta = store.get_session_meta(&id).unwrap().unwrap();
        assert_eq!(meta.status, SessionStatus::Complete);
    }

    #[test]
    fn finish_twice_rolls_back_second_event() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        let _ = store.fail_session(&id, "upstream", "first").unwrap();
        assert!(store.fail_session(&id, "upstream", "second").is_err());
        assert_eq!(store.read_events_since(&id, 0).unwrap().len(), 1);
    }

    // ── Maintenance ───────────────────────────────────────────────────

    #[test]
    fn stale_running_sessions() {
        let store = setup();
        let _ = store.create_session(&SessionId::from("live"), "u", None).unwrap();
        let done = SessionId::from("done");
        let _ = store.create_session(&done, "u", None).unwrap();
        store.set_status(&done, SessionStatus::Complete).unwrap();

        let future = Utc::now() + chrono::Duration::minutes(1);
        let stale = store.list_running_created_before(future).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].session_id.as_str(), "live");
        assert!(store.list_stale_running(Duration::from_secs(3600)).unwrap().is_empty());
    }

    #[test]
    fn purge_removes_terminal_sessions_and_events() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        let _ = store.append_event(&id, &delta("a")).unwrap();
        store.set_status(&id, SessionStatus::Complete).unwrap();
        let running = SessionId::from("s2");
        let _ = store.create_session(&running, "u1", None).unwrap();

        let purged = store
            .purge_terminal_before(Utc::now() + chrono::Duration::minutes(1))
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.get_session_meta(&id).unwrap().is_none());
        assert!(store.read_events_since(&id, 0).unwrap().is_empty());
        assert_matches!(
            store.append_event(&id, &delta("late")),
            Err(EventStoreError::SessionNotFound(_))
        );
        assert!(store.get_session_meta(&running).unwrap().is_some());
    }

    #[test]
    fn purge_respects_grace() {
        let store = setup();
        let id = SessionId::from("s1");
        let _ = store.create_session(&id, "u1", None).unwrap();
        store.set_status(&id, SessionStatus::Error).unwrap();
        assert_eq!(store.purge_expired_sessions(Duration::from_secs(3600)).unwrap(), 0);
    }
}
