//! Orchestrator: multi-session coordinator.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tether_core::{SessionId, WorkflowId};
use tether_events::{EventStoreError, WorkflowStore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use super::session_runner::{RunnerDeps, SessionRunner, SessionSpec};
use crate::errors::RuntimeError;

/// Request to start a session.
#[derive(Clone, Debug)]
pub struct StartSession {
    /// Client-chosen id; generated when absent.
    pub session_id: Option<SessionId>,
    /// Authenticated caller.
    pub owner_id: String,
    /// Workflow to edit.
    pub workflow_id: Option<WorkflowId>,
    /// Chat message.
    pub message: String,
}

/// Starts sessions in the background and tracks the live ones.
///
/// Each session gets its own cancellation token, a child of the
/// orchestrator's shutdown token. Clients disconnecting never touch it.
pub struct Orchestrator {
    deps: Arc<RunnerDeps>,
    workflows: WorkflowStore,
    active: Arc<DashMap<SessionId, CancellationToken>>,
    max_concurrent_sessions: usize,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Orchestrator {
    /// Create an orchestrator.
    pub fn new(deps: Arc<RunnerDeps>, workflows: WorkflowStore, max_concurrent: usize) -> Self {
        Self {
            deps,
            workflows,
            active: Arc::new(DashMap::new()),
            max_concurrent_sessions: max_concurrent,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Create the session record and spawn its runner. Returns as soon as
    /// the session exists.
    #[instrument(skip_all, fields(owner_id = %req.owner_id))]
    pub fn start_session(&self, req: StartSession) -> Result<SessionId, RuntimeError> {
        if self.shutdown.is_cancelled() {
            return Err(RuntimeError::ShuttingDown);
        }
        if !self.can_accept_session() {
            return Err(RuntimeError::CapacityReached(self.max_concurrent_sessions));
        }
        if let Some(workflow_id) = &req.workflow_id {
            match self.workflows.workflow_owner(workflow_id)? {
                None => return Err(RuntimeError::NotFound(format!("workflow {workflow_id}"))),
                Some(owner) if owner != req.owner_id => return Err(RuntimeError::Forbidden),
                Some(_) => {}
            }
        }

        let session_id = req.session_id.unwrap_or_default();
        let _ = self
            .deps
            .event_store
            .create_session(&session_id, &req.owner_id, req.workflow_id.as_ref())
            .map_err(|e| match e {
                EventStoreError::SessionExists(id) => RuntimeError::SessionExists(id),
                other => RuntimeError::Persistence(other),
            })?;

        let cancel = self.shutdown.child_token();
        let _ = self.active.insert(session_id.clone(), cancel.clone());

        let runner = SessionRunner::new(
            Arc::clone(&self.deps),
            SessionSpec {
                session_id: session_id.clone(),
                owner_id: req.owner_id,
                workflow_id: req.workflow_id,
                message: req.message,
            },
            cancel,
        );
        let active = Arc::clone(&self.active);
        let sid = session_id.clone();
        let _ = self.tracker.spawn(async move {
            let status = runner.run().await;
            let _ = active.remove(&sid);
            debug!(session_id = %sid, %status, "session task exited");
        });

        info!(session_id = %session_id, "session started");
        Ok(session_id)
    }

    /// Whether a runner task is live for the session.
    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.active.contains_key(session_id)
    }

    /// Live runner count.
    pub fn active_session_count(&self) -> usize {
        self.active.len()
    }

    /// Maximum concurrent session limit.
    pub fn max_concurrent_sessions(&self) -> usize {
        self.max_concurrent_sessions
    }

    /// Whether another session fits under the limit.
    pub fn can_accept_session(&self) -> bool {
        self.active.len() < self.max_concurrent_sessions
    }

    /// Cancel one running session. It ends `error` with category `shutdown`.
    pub fn cancel(&self, session_id: &SessionId) -> bool {
        match self.active.get(session_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every session and wait up to `grace` for runners to record
    /// their terminal status. Returns `false` if the grace period ran out.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        info!(active = self.active.len(), "orchestrator shutting down");
        self.shutdown.cancel();
        let _ = self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            true
        } else {
            warn!(remaining = self.active.len(), "shutdown grace period elapsed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelClient, StepContext, StepOutput};
    use crate::orchestrator::session_runner::tests::{RecordingTool, ScriptedModel, fast_config, harness};
    use crate::errors::ModelError;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use tether_core::SessionStatus;

    /// Model that blocks until cancelled.
    struct StallingModel;

    #[async_trait]
    impl ModelClient for StallingModel {
        async fn run_step(&self, _ctx: &StepContext) -> Result<StepOutput, ModelError> {
            std::future::pending().await
        }
    }

    fn start(owner: &str, id: Option<&str>) -> StartSession {
        StartSession {
            session_id: id.map(SessionId::from),
            owner_id: owner.into(),
            workflow_id: Some(WorkflowId::from("wf")),
            message: "hi".into(),
        }
    }

    async fn wait_terminal(store: &tether_events::EventStore, id: &SessionId) -> SessionStatus {
        for _ in 0..200 {
            let meta = store.get_session_meta(id).unwrap().unwrap();
            if meta.status.is_terminal() {
                return meta.status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {id} never finished");
    }

    #[tokio::test]
    async fn start_runs_in_background() {
        let h = harness(Arc::new(ScriptedModel::new(vec![])), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);

        let id = orch.start_session(start("alice", Some("s1"))).unwrap();
        assert_eq!(id.as_str(), "s1");
        assert_eq!(wait_terminal(&h.store, &id).await, SessionStatus::Complete);
    }

    #[tokio::test]
    async fn generated_id_when_absent() {
        let h = harness(Arc::new(ScriptedModel::new(vec![])), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);
        let id = orch.start_session(start("alice", None)).unwrap();
        assert!(!id.is_empty());
    }

    #[tokio::test]
    async fn duplicate_id_rejected() {
        let h = harness(Arc::new(StallingModel), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);
        let _ = orch.start_session(start("alice", Some("dup"))).unwrap();
        assert_matches!(
            orch.start_session(start("alice", Some("dup"))),
            Err(RuntimeError::SessionExists(_))
        );
        let _ = orch.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn foreign_workflow_rejected() {
        let h = harness(Arc::new(ScriptedModel::new(vec![])), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);
        assert_matches!(orch.start_session(start("mallory", None)), Err(RuntimeError::Forbidden));

        let mut missing = start("alice", None);
        missing.workflow_id = Some(WorkflowId::from("nope"));
        assert_matches!(orch.start_session(missing), Err(RuntimeError::NotFound(_)));
    }

    #[tokio::test]
    async fn capacity_enforced() {
        let h = harness(Arc::new(StallingModel), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 2);
        let _ = orch.start_session(start("alice", Some("a"))).unwrap();
        let _ = orch.start_session(start("alice", Some("b"))).unwrap();
        assert!(!orch.can_accept_session());
        assert_matches!(
            orch.start_session(start("alice", Some("c"))),
            Err(RuntimeError::CapacityReached(2))
        );
        let _ = orch.shutdown(Duration::from_secs(5)).await;
    }

    #[tokio::test]
    async fn shutdown_fails_running_sessions() {
        let h = harness(Arc::new(StallingModel), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);
        let id = orch.start_session(start("alice", Some("s"))).unwrap();
        assert!(orch.is_active(&id));

        assert!(orch.shutdown(Duration::from_secs(5)).await);
        assert_eq!(orch.active_session_count(), 0);
        let events = h.store.read_events_since(&id, 0).unwrap();
        match &events.last().unwrap().payload {
            tether_core::CopilotEvent::Error { category, .. } => assert_eq!(category, "shutdown"),
            other => panic!("unexpected {other:?}"),
        }
        assert_matches!(orch.start_session(start("alice", None)), Err(RuntimeError::ShuttingDown));
    }

    #[tokio::test]
    async fn cancel_single_session() {
        let h = harness(Arc::new(StallingModel), &[], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);
        let id = orch.start_session(start("alice", Some("s"))).unwrap();
        assert!(orch.cancel(&id));
        assert_eq!(wait_terminal(&h.store, &id).await, SessionStatus::Error);
        assert!(!orch.cancel(&SessionId::from("unknown")));
    }

    #[tokio::test]
    async fn concurrent_sessions_finish_independently() {
        let tool = Arc::new(RecordingTool::new("lookup", false, false));
        let h = harness(Arc::new(ScriptedModel::new(vec![])), &[tool], fast_config());
        let orch = Orchestrator::new(Arc::clone(&h.deps), h.workflows.clone(), 4);
        let a = orch.start_session(start("alice", Some("a"))).unwrap();
        let b = orch.start_session(start("alice", Some("b"))).unwrap();
        assert_eq!(wait_terminal(&h.store, &a).await, SessionStatus::Complete);
        assert_eq!(wait_terminal(&h.store, &b).await, SessionStatus::Complete);
    }
}
