//! Tail loop: replays a session's committed events, then polls for new ones
//! until the session ends, the budget runs out, or the server shuts down.
//!
//! Delivery derives only from the append-only log and the caller's cursor,
//! so any number of readers can tail the same session and a reconnecting
//! reader that passes its last seen id never sees an event twice.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use serde_json::json;
use tether_core::SessionId;
use tether_events::{EventStore, SessionMeta};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sse;
use crate::errors::ApiError;

/// Poll timing for one tail connection.
#[derive(Clone, Copy, Debug)]
pub struct TailTiming {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Absolute budget; the stream ends quietly when exceeded.
    pub max_duration: Duration,
}

/// Load session metadata and check ownership.
pub fn authorize_session(store: &EventStore, session_id: &SessionId, requester_id: &str) -> Result<SessionMeta, ApiError> {
    let meta = store
        .get_session_meta(session_id)?
        .ok_or_else(|| ApiError::NotFound(format!("session {session_id}")))?;
    if meta.owner_id != requester_id {
        return Err(ApiError::Forbidden);
    }
    Ok(meta)
}

/// Frames for every event after `from`, followed by live updates.
///
/// The stream is dropped when the client disconnects, which ends the loop at
/// its next suspension point.
pub fn tail_stream(
    store: EventStore,
    session_id: SessionId,
    from: u64,
    timing: TailTiming,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        let deadline = Instant::now() + timing.max_duration;
        let mut cursor = from;
        debug!(session_id = %session_id, from, "tail started");

        loop {
            let meta = match store.get_session_meta(&session_id) {
                Ok(Some(meta)) => meta,
                Ok(None) => {
                    debug!(session_id = %session_id, "session gone, ending tail");
                    break;
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "tail metadata read failed");
                    if let Some(frame) = sse::named_frame("error", &json!({ "message": e.to_string() })) {
                        yield Ok(frame);
                    }
                    break;
                }
            };

            match store.read_events_since(&session_id, cursor) {
                Ok(events) => {
                    for event in events {
                        cursor = event.event_id;
                        if let Some(frame) = sse::event_frame(&event) {
                            yield Ok(frame);
                        }
                    }
                }
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "tail event read failed");
                    if let Some(frame) = sse::named_frame("error", &json!({ "message": e.to_string() })) {
                        yield Ok(frame);
                    }
                    break;
                }
            }

            // Status was read before the final replay, so every event the
            // writer committed with the terminal status is already out.
            if meta.status.is_terminal() {
                yield Ok(sse::done_frame(meta.status, cursor));
                break;
            }

            let now = Instant::now();
            if now >= deadline {
                info!(session_id = %session_id, cursor, "tail budget exhausted, closing");
                break;
            }
            tokio::select! {
                () = shutdown.cancelled() => {
                    debug!(session_id = %session_id, "tail cancelled by shutdown");
                    break;
                }
                () = sleep(timing.poll_interval.min(deadline - now)) => {}
            }
        }
    }
}
