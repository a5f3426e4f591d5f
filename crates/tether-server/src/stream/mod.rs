//! Resumable stream server: SSE framing, the per-connection tail loop and
//! live-view reset fan-out.

pub mod live;
pub mod sse;
pub mod tail;

pub use live::{LiveViewHub, live_stream};
pub use tail::{TailTiming, authorize_session, tail_stream};
