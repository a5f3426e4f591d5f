//! Event log behavior over a file-backed pool.

use std::thread;

use proptest::prelude::*;
use tether_core::{CopilotEvent, SessionId, SessionStatus, ToolCallId, ToolOutcome};
use tether_events::{ConnectionConfig, EventStore, EventStoreError};

fn file_store() -> (tempfile::TempDir, EventStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.db");
    let pool = tether_events::new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        let _ = tether_events::run_migrations(&conn).unwrap();
    }
    (dir, EventStore::new(pool))
}

fn delta(n: usize) -> CopilotEvent {
    CopilotEvent::ContentDelta { text: format!("chunk-{n}") }
}

#[test]
fn five_event_session_reads_back_in_order() {
    let (_dir, store) = file_store();
    let sid = SessionId::from("s1");
    let _ = store.create_session(&sid, "u1", None).unwrap();

    let _ = store.append_event(&sid, &delta(0)).unwrap();
    let _ = store
        .append_event(
            &sid,
            &CopilotEvent::ToolCallRequested {
                tool_call_id: ToolCallId::from("c1"),
                tool_name: "edit_workflow".into(),
                arguments: serde_json::json!({"op": "add"}),
                requires_approval: true,
            },
        )
        .unwrap();
    let _ = store
        .append_event(
            &sid,
            &CopilotEvent::ToolCallResolved {
                tool_call_id: ToolCallId::from("c1"),
                tool_name: "edit_workflow".into(),
                outcome: ToolOutcome::Success,
                result: None,
                message: None,
            },
        )
        .unwrap();
    let _ = store.append_event(&sid, &delta(1)).unwrap();
    let last = store
        .finish_session(
            &sid,
            &CopilotEvent::Summary { text: "done".into(), steps: 2 },
            SessionStatus::Complete,
        )
        .unwrap();
    assert_eq!(last, 5);

    let all = store.read_events_since(&sid, 0).unwrap();
    let ids: Vec<u64> = all.iter().map(|e| e.event_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    assert_eq!(all[1].payload.event_type(), "tool_call_requested");

    let tail = store.read_events_since(&sid, 3).unwrap();
    assert_eq!(tail.len(), 2);
    assert_eq!(tail[0].event_id, 4);

    let meta = store.get_session_meta(&sid).unwrap().unwrap();
    assert_eq!(meta.status, SessionStatus::Complete);
    assert_eq!(meta.last_event_id, 5);

    assert!(matches!(
        store.append_event(&sid, &delta(9)),
        Err(EventStoreError::SessionClosed(_))
    ));
}

#[test]
fn concurrent_readers_see_gapless_prefixes() {
    let (_dir, store) = file_store();
    let sid = SessionId::from("s1");
    let _ = store.create_session(&sid, "u1", None).unwrap();

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            let sid = sid.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let events = store.read_events_since(&sid, 0).unwrap();
                    for (i, ev) in events.iter().enumerate() {
                        assert_eq!(ev.event_id, i as u64 + 1);
                    }
                }
            })
        })
        .collect();

    for n in 0..100 {
        let _ = store.append_event(&sid, &delta(n)).unwrap();
    }
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(store.read_events_since(&sid, 0).unwrap().len(), 100);
}

#[test]
fn purge_removes_events_with_session() {
    let (_dir, store) = file_store();
    let sid = SessionId::from("s1");
    let _ = store.create_session(&sid, "u1", None).unwrap();
    let _ = store.append_event(&sid, &delta(0)).unwrap();
    let _ = store.fail_session(&sid, "internal", "boom").unwrap();

    let cutoff = chrono::Utc::now() + chrono::Duration::seconds(1);
    assert_eq!(store.purge_terminal_before(cutoff).unwrap(), 1);
    assert!(store.get_session_meta(&sid).unwrap().is_none());
    assert!(store.read_events_since(&sid, 0).unwrap().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// `read_since(k)` returns exactly the events with ids in `(k, n]`.
    #[test]
    fn read_since_is_exact(n in 0usize..30, k in 0u64..40) {
        let (_dir, store) = file_store();
        let sid = SessionId::from("p");
        let _ = store.create_session(&sid, "u", None).unwrap();
        for i in 0..n {
            let _ = store.append_event(&sid, &delta(i)).unwrap();
        }
        let got: Vec<u64> = store.read_events_since(&sid, k).unwrap().iter().map(|e| e.event_id).collect();
        let expected: Vec<u64> = ((k + 1)..=(n as u64)).collect();
        prop_assert_eq!(got, expected);
    }

    /// A reader that disconnects after any prefix and resumes from its last
    /// seen id observes every event exactly once.
    #[test]
    fn reconnect_sees_each_event_once(n in 1usize..25, cut in 0usize..25) {
        let (_dir, store) = file_store();
        let sid = SessionId::from("p");
        let _ = store.create_session(&sid, "u", None).unwrap();
        let cut = cut.min(n);
        for i in 0..cut {
            let _ = store.append_event(&sid, &delta(i)).unwrap();
        }
        let first = store.read_events_since(&sid, 0).unwrap();
        let last_seen = first.last().map_or(0, |e| e.event_id);
        for i in cut..n {
            let _ = store.append_event(&sid, &delta(i)).unwrap();
        }
        let second = store.read_events_since(&sid, last_seen).unwrap();

        let texts: Vec<String> = first
            .iter()
            .chain(second.iter())
            .map(|e| match &e.payload {
                CopilotEvent::ContentDelta { text } => text.clone(),
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        let expected: Vec<String> = (0..n).map(|i| format!("chunk-{i}")).collect();
        prop_assert_eq!(texts, expected);
    }
}
