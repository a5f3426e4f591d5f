//! `TetherServer`: axum HTTP server for the copilot subsystem.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use tether_events::{EventStore, WorkflowStore};
use tether_runtime::checkpoint::CheckpointManager;
use tether_runtime::{Mailbox, Orchestrator};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::HealthResponse;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;
use crate::stream::{LiveViewHub, TailTiming};

/// Collaborators the server is built from.
pub struct ServerDeps {
    /// Event log.
    pub events: EventStore,
    /// Workflow ownership lookups.
    pub workflows: WorkflowStore,
    /// Session coordinator.
    pub orchestrator: Arc<Orchestrator>,
    /// Decision handoff written by the confirm route.
    pub mailbox: Arc<dyn Mailbox>,
    /// Checkpoint create/list/rename/revert.
    pub checkpoints: Arc<CheckpointManager>,
    /// Live-view fan-out. Must be the notifier the checkpoint manager uses.
    pub live: Arc<LiveViewHub>,
}

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Event log.
    pub events: EventStore,
    /// Workflow ownership lookups.
    pub workflows: WorkflowStore,
    /// Session coordinator.
    pub orchestrator: Arc<Orchestrator>,
    /// Decision handoff.
    pub mailbox: Arc<dyn Mailbox>,
    /// Checkpoints.
    pub checkpoints: Arc<CheckpointManager>,
    /// Live-view fan-out.
    pub live: Arc<LiveViewHub>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Tail loop timing.
    pub tail_timing: TailTiming,
    /// When the server started.
    pub start_time: Instant,
}

/// The tether HTTP server.
pub struct TetherServer {
    config: ServerConfig,
    state: AppState,
}

impl TetherServer {
    /// Create a new server.
    pub fn new(config: ServerConfig, deps: ServerDeps) -> Self {
        let state = AppState {
            events: deps.events,
            workflows: deps.workflows,
            orchestrator: deps.orchestrator,
            mailbox: deps.mailbox,
            checkpoints: deps.checkpoints,
            live: deps.live,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            tail_timing: TailTiming {
                poll_interval: config.poll_interval(),
                max_duration: config.max_tail_duration(),
            },
            start_time: Instant::now(),
        };
        Self { config, state }
    }

    /// Build the axum router with all routes.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .merge(routes::api_routes())
            .with_state(self.state.clone())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind and serve in the background. The server stops accepting once the
    /// shutdown token is cancelled and exits when open streams have closed.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.state.shutdown.token();

        info!(%addr, "tether server listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                error!(error = %e, "http server failed");
            }
        });
        Ok((addr, handle))
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.state.shutdown
    }

    /// Get the session coordinator.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.state.orchestrator
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(
        state.start_time,
        state.orchestrator.active_session_count(),
        state.orchestrator.max_concurrent_sessions(),
        state.shutdown.is_shutting_down(),
    ))
}
