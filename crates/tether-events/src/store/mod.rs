//! Transactional store APIs over the connection pool.
//!
//! Every write method runs inside one `SQLite` transaction, so callers never
//! observe partial state.

mod decision_store;
mod event_store;
mod workflow_store;

pub use decision_store::DecisionStore;
pub use event_store::EventStore;
pub use workflow_store::WorkflowStore;

use chrono::{DateTime, SecondsFormat, Utc};

/// Millisecond-precision RFC 3339 in UTC. Lexicographic order matches time
/// order, which the cutoff queries rely on.
pub(crate) fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn now_rfc3339() -> String {
    rfc3339(Utc::now())
}

/// `now - age`, saturating at the minimum representable time.
pub(crate) fn cutoff_before(age: std::time::Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(age)
        .ok()
        .and_then(|d| Utc::now().checked_sub_signed(d))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
