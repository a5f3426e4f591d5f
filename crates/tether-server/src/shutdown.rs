//! Shutdown sequencing.
//!
//! One [`CancellationToken`] fans out to the HTTP listener, every tail and
//! live-view stream, and the watchdog. Running sessions are drained
//! separately so each can write its terminal `shutdown` event.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What finished inside the shutdown budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Every running session reached a terminal status.
    pub sessions_drained: bool,
    /// Every background task exited.
    pub tasks_joined: bool,
}

/// Owns the server-wide shutdown token.
#[derive(Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
}

impl ShutdownCoordinator {
    /// Create a coordinator with a fresh token.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that observes shutdown.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trip the token. Idempotent.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Trip the token, then wait for `drain_sessions` and the given tasks,
    /// sharing one `budget`. Tasks still running at the deadline are left
    /// behind.
    pub async fn graceful_shutdown<F>(&self, drain_sessions: F, handles: Vec<JoinHandle<()>>, budget: Duration) -> ShutdownReport
    where
        F: Future<Output = bool>,
    {
        self.shutdown();
        let deadline = Instant::now() + budget;
        info!(tasks = handles.len(), budget_ms = budget.as_millis(), "shutdown started");

        let sessions_drained = tokio::time::timeout_at(deadline, drain_sessions)
            .await
            .unwrap_or(false);
        let tasks_joined = tokio::time::timeout_at(deadline, futures::future::join_all(handles))
            .await
            .is_ok();

        let report = ShutdownReport {
            sessions_drained,
            tasks_joined,
        };
        if sessions_drained && tasks_joined {
            info!("shutdown drained cleanly");
        } else {
            warn!(sessions_drained, tasks_joined, "shutdown budget exhausted");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_observe_shutdown() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        assert!(!coord.is_shutting_down());
        coord.shutdown();
        coord.shutdown();
        assert!(coord.is_shutting_down());
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn clean_drain() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let task = tokio::spawn(async move { token.cancelled().await });

        let report = coord
            .graceful_shutdown(async { true }, vec![task], Duration::from_secs(5))
            .await;
        assert_eq!(
            report,
            ShutdownReport {
                sessions_drained: true,
                tasks_joined: true
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_task_hits_the_budget() {
        let coord = ShutdownCoordinator::new();
        let stuck = tokio::spawn(std::future::pending::<()>());
        let started = Instant::now();

        let report = coord
            .graceful_shutdown(async { true }, vec![stuck], Duration::from_secs(2))
            .await;
        assert!(report.sessions_drained);
        assert!(!report.tasks_joined);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_sessions_share_the_budget() {
        let coord = ShutdownCoordinator::new();
        let drain = async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            true
        };
        let report = coord.graceful_shutdown(drain, Vec::new(), Duration::from_secs(1)).await;
        assert!(!report.sessions_drained);
        assert!(report.tasks_joined);
    }
}
