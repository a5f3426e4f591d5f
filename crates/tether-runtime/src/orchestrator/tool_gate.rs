//! Bounded wait for a human decision on one tool call.

use std::time::Duration;

use tether_core::ToolCallId;
use tether_events::Decision;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::mailbox::Mailbox;

/// How a suspended tool call was released.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// A decision arrived.
    Decided(Decision),
    /// The wait was exhausted with no decision.
    TimedOut,
    /// The session was cancelled while waiting.
    Cancelled,
}

/// Poll timing for [`await_decision`].
#[derive(Clone, Copy, Debug)]
pub struct GateTiming {
    /// Delay between mailbox polls.
    pub poll_interval: Duration,
    /// Total time to wait before treating the call as rejected.
    pub max_wait: Duration,
}

/// Poll the mailbox until a decision arrives, the wait runs out, or the
/// session is cancelled.
///
/// Mailbox read failures are logged and retried on the next tick; they never
/// extend the deadline.
pub async fn await_decision(
    mailbox: &dyn Mailbox,
    tool_call_id: &ToolCallId,
    timing: GateTiming,
    cancel: &CancellationToken,
) -> GateOutcome {
    let deadline = Instant::now() + timing.max_wait;
    loop {
        match mailbox.poll_decision(tool_call_id).await {
            Ok(Some(decision)) => {
                debug!(tool_call_id = %tool_call_id, status = %decision.status, "decision received");
                return GateOutcome::Decided(decision);
            }
            Ok(None) => {}
            Err(e) => warn!(tool_call_id = %tool_call_id, error = %e, "mailbox poll failed"),
        }

        let now = Instant::now();
        if now >= deadline {
            return GateOutcome::TimedOut;
        }
        let nap = timing.poll_interval.min(deadline - now);
        tokio::select! {
            () = cancel.cancelled() => return GateOutcome::Cancelled,
            () = sleep(nap) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::errors::MailboxError;
    use crate::mailbox::MemoryMailbox;
    use tether_core::DecisionStatus;
    use tether_core::logging::capture_logs;

    const TIMING: GateTiming = GateTiming {
        poll_interval: Duration::from_millis(500),
        max_wait: Duration::from_secs(10),
    };

    #[tokio::test(start_paused = true)]
    async fn times_out_without_decision() {
        let mb = MemoryMailbox::new(Duration::from_secs(60));
        let started = Instant::now();
        let out = await_decision(&mb, &ToolCallId::from("t"), TIMING, &CancellationToken::new()).await;
        assert_eq!(out, GateOutcome::TimedOut);
        assert!(started.elapsed() >= TIMING.max_wait);
        assert!(started.elapsed() < TIMING.max_wait + TIMING.poll_interval);
    }

    #[tokio::test(start_paused = true)]
    async fn decision_from_another_task_releases_gate() {
        let mb = Arc::new(MemoryMailbox::new(Duration::from_secs(60)));
        let writer = Arc::clone(&mb);
        let handle = tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            writer
                .record_decision(&ToolCallId::from("t"), DecisionStatus::Accepted, None)
                .await
                .unwrap();
        });

        let out = await_decision(mb.as_ref(), &ToolCallId::from("t"), TIMING, &CancellationToken::new()).await;
        handle.await.unwrap();
        match out {
            GateOutcome::Decided(d) => assert_eq!(d.status, DecisionStatus::Accepted),
            other => panic!("expected decision, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_wins() {
        let mb = MemoryMailbox::new(Duration::from_secs(60));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let _ = tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });
        let out = await_decision(&mb, &ToolCallId::from("t"), TIMING, &cancel).await;
        assert_eq!(out, GateOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn decision_already_present() {
        let mb = MemoryMailbox::new(Duration::from_secs(60));
        mb.record_decision(&ToolCallId::from("t"), DecisionStatus::Rejected, Some("no"))
            .await
            .unwrap();
        let out = await_decision(&mb, &ToolCallId::from("t"), TIMING, &CancellationToken::new()).await;
        assert!(matches!(out, GateOutcome::Decided(d) if d.status == DecisionStatus::Rejected));
    }

    struct BrokenMailbox;

    #[async_trait::async_trait]
    impl Mailbox for BrokenMailbox {
        async fn record_decision(
            &self,
            _tool_call_id: &ToolCallId,
            _status: DecisionStatus,
            _message: Option<&str>,
        ) -> Result<(), MailboxError> {
            Err(MailboxError::Unavailable("down".into()))
        }

        async fn poll_decision(&self, _tool_call_id: &ToolCallId) -> Result<Option<Decision>, MailboxError> {
            Err(MailboxError::Unavailable("down".into()))
        }

        async fn purge_expired(&self) -> Result<usize, MailboxError> {
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn poll_failures_are_logged_and_do_not_extend_the_wait() {
        let (logs, _guard) = capture_logs();
        let started = Instant::now();
        let out = await_decision(&BrokenMailbox, &ToolCallId::from("t"), TIMING, &CancellationToken::new()).await;
        assert_eq!(out, GateOutcome::TimedOut);
        assert!(started.elapsed() < TIMING.max_wait + TIMING.poll_interval);
        let warnings = logs.at_level(tracing::Level::WARN);
        assert!(!warnings.is_empty());
        assert_eq!(warnings[0].field("tool_call_id"), Some("t"));
    }
}
