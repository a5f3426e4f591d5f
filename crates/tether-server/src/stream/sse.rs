//! Server-sent event framing.

use std::convert::Infallible;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::Serialize;
use serde_json::json;
use tether_core::SessionStatus;
use tether_events::LoggedEvent;
use tracing::warn;

/// Frame for one logged event. The `id:` line lets browsers resume with
/// `Last-Event-ID`.
pub fn event_frame(event: &LoggedEvent) -> Option<Bytes> {
    match serde_json::to_string(event) {
        Ok(data) => Some(Bytes::from(format!(
            "id: {}\nevent: {}\ndata: {data}\n\n",
            event.event_id,
            event.payload.event_type()
        ))),
        Err(e) => {
            warn!(event_id = event.event_id, error = %e, "failed to serialize event");
            None
        }
    }
}

/// Final frame sent once a session reaches a terminal status.
pub fn done_frame(status: SessionStatus, last_event_id: u64) -> Bytes {
    named_frame("done", &json!({ "status": status, "lastEventId": last_event_id }))
        .unwrap_or_else(|| Bytes::from_static(b"event: done\ndata: {}\n\n"))
}

/// Frame with an explicit event name and a JSON body.
pub fn named_frame<T: Serialize>(name: &str, data: &T) -> Option<Bytes> {
    match serde_json::to_string(data) {
        Ok(data) => Some(Bytes::from(format!("event: {name}\ndata: {data}\n\n"))),
        Err(e) => {
            warn!(event = name, error = %e, "failed to serialize frame");
            None
        }
    }
}

/// Comment frame. Ignored by clients; flushes headers.
pub fn comment_frame(text: &str) -> Bytes {
    Bytes::from(format!(": {text}\n\n"))
}

/// Wrap a frame stream in a `text/event-stream` response.
pub fn sse_response<S>(stream: S) -> Response
where
    S: futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static,
{
    let mut headers = HeaderMap::new();
    let _ = headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    let _ = headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    let _ = headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    (headers, Body::from_stream(stream)).into_response()
}
