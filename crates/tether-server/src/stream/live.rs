//! In-process fan-out of workflow reset notifications to live viewers.

use std::convert::Infallible;

use bytes::Bytes;
use dashmap::DashMap;
use futures::Stream;
use tether_core::WorkflowId;
use tether_runtime::checkpoint::{WorkflowNotifier, WorkflowReset};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::sse;

/// Default per-workflow channel capacity.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One broadcast channel per watched workflow.
pub struct LiveViewHub {
    channels: DashMap<WorkflowId, broadcast::Sender<WorkflowReset>>,
    capacity: usize,
}

impl LiveViewHub {
    /// Create a hub with the given per-workflow buffer.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Start receiving resets for a workflow.
    pub fn subscribe(&self, workflow_id: &WorkflowId) -> broadcast::Receiver<WorkflowReset> {
        self.channels
            .entry(workflow_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Live viewers of a workflow.
    pub fn viewer_count(&self, workflow_id: &WorkflowId) -> usize {
        self.channels
            .get(workflow_id)
            .map_or(0, |tx| tx.receiver_count())
    }
}

impl Default for LiveViewHub {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl WorkflowNotifier for LiveViewHub {
    fn notify_workflow_reset(&self, reset: &WorkflowReset) {
        let sent = self
            .channels
            .get(&reset.workflow_id)
            .map(|tx| tx.send(reset.clone()));
        match sent {
            Some(Ok(viewers)) => debug!(workflow_id = %reset.workflow_id, reason = %reset.reason, viewers, "workflow reset sent"),
            Some(Err(_)) => {
                let _ = self
                    .channels
                    .remove_if(&reset.workflow_id, |_, tx| tx.receiver_count() == 0);
                debug!(workflow_id = %reset.workflow_id, "no live viewers left");
            }
            None => debug!(workflow_id = %reset.workflow_id, "no live viewers"),
        }
    }
}

/// SSE frames for one live viewer.
pub fn live_stream(
    mut rx: broadcast::Receiver<WorkflowReset>,
    shutdown: CancellationToken,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    async_stream::stream! {
        yield Ok(sse::comment_frame("connected"));
        loop {
            tokio::select! {
                () = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(reset) => {
                        if let Some(frame) = sse::named_frame("workflow_reset", &reset) {
                            yield Ok(frame);
                        }
                    }
                    // Any reset means "reload"; newer ones are still queued.
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "live viewer lagged"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    }
}
