//! # tether-agent
//!
//! Tether copilot server binary. Wires settings, logging, `SQLite`, the
//! session runtime and the HTTP server together and runs until signalled.

#![deny(unsafe_code)]

mod model_client;
mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tether_core::logging::{LogFormat, init_subscriber};
use tether_core::workflow::BlockRegistry;
use tether_events::{ConnectionConfig, DecisionStore, EventStore, WorkflowStore};
use tether_runtime::checkpoint::{CheckpointManager, WorkflowNotifier};
use tether_runtime::orchestrator::{RunnerConfig, RunnerDeps};
use tether_runtime::{Mailbox, Orchestrator, SqliteMailbox, Watchdog, WatchdogConfig};
use tether_server::{LiveViewHub, ServerConfig, ServerDeps, TetherServer};
use tether_settings::TetherSettings;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::model_client::HttpModelClient;

/// Tether copilot server.
#[derive(Parser, Debug)]
#[command(name = "tether-agent", about = "Tether copilot server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Path to the `SQLite` database (overrides settings).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Settings file (defaults to `~/.tether/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Maximum concurrent sessions (overrides settings).
    #[arg(long)]
    max_sessions: Option<usize>,
}

impl Cli {
    /// Fold command-line overrides into loaded settings.
    fn apply(&self, settings: &mut TetherSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(max) = self.max_sessions {
            settings.copilot.max_concurrent_sessions = max;
        }
    }
}

/// Database location: the CLI flag wins, then `server.dbPath` (relative
/// paths resolve against the data directory).
fn resolve_db_path(cli_db_path: Option<PathBuf>, settings: &TetherSettings, data_dir: &Path) -> PathBuf {
    cli_db_path.unwrap_or_else(|| {
        let configured = PathBuf::from(&settings.server.db_path);
        if configured.is_absolute() {
            configured
        } else {
            data_dir.join(configured)
        }
    })
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}

/// Everything `main` starts and later shuts down.
struct App {
    server: TetherServer,
    orchestrator: Arc<Orchestrator>,
    watchdog: Watchdog,
    shutdown_timeout: std::time::Duration,
}

/// Open the database and build the runtime and server.
fn build_app(settings: &TetherSettings, db_path: &Path) -> Result<App> {
    let db_str = db_path.to_string_lossy();
    let pool = tether_events::new_file(&db_str, &ConnectionConfig::default())
        .with_context(|| format!("Failed to open database: {}", db_path.display()))?;
    {
        let conn = pool.get().context("Failed to get database connection")?;
        let applied = tether_events::run_migrations(&conn).context("Failed to run migrations")?;
        tracing::info!(path = %db_path.display(), applied, "database ready");
    }

    let events = EventStore::new(pool.clone());
    let workflows = WorkflowStore::new(pool.clone());
    let mailbox: Arc<dyn Mailbox> = Arc::new(SqliteMailbox::new(
        DecisionStore::new(pool),
        settings.copilot.decision_ttl(),
    ));

    let live = Arc::new(LiveViewHub::default());
    let notifier: Arc<dyn WorkflowNotifier> = live.clone();
    let checkpoints = Arc::new(CheckpointManager::new(
        workflows.clone(),
        BlockRegistry::new(settings.workflow.known_block_types.iter().cloned()),
        notifier.clone(),
    ));

    let model = HttpModelClient::new(settings.copilot.model_endpoint.clone());
    if model.is_configured() {
        tracing::info!("model endpoint configured, agent execution enabled");
    } else {
        tracing::warn!("copilot.modelEndpoint not set, sessions will fail at their first step");
    }
    let registry = tools::builtin_registry(workflows.clone(), notifier);
    tracing::info!(tools = ?registry.names(), "tool registry built");

    let deps = Arc::new(RunnerDeps {
        event_store: events.clone(),
        mailbox: mailbox.clone(),
        model: Arc::new(model),
        tools: Arc::new(registry),
        checkpoints: checkpoints.clone(),
        config: RunnerConfig::from_settings(&settings.copilot),
    });
    let orchestrator = Arc::new(Orchestrator::new(
        deps,
        workflows.clone(),
        settings.copilot.max_concurrent_sessions,
    ));

    let watchdog = Watchdog::new(
        events.clone(),
        mailbox.clone(),
        orchestrator.clone(),
        WatchdogConfig::from_settings(settings),
    );

    let config = ServerConfig::from_settings(settings);
    let shutdown_timeout = config.shutdown_timeout();
    let server = TetherServer::new(
        config,
        ServerDeps {
            events,
            workflows,
            orchestrator: orchestrator.clone(),
            mailbox,
            checkpoints,
            live,
        },
    );

    Ok(App {
        server,
        orchestrator,
        watchdog,
        shutdown_timeout,
    })
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut term = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("Failed to listen for ctrl-c")?,
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_file = args.settings.clone().unwrap_or_else(tether_settings::settings_path);
    let mut settings = tether_settings::load_settings_from_path(&settings_file)
        .with_context(|| format!("Failed to load settings: {}", settings_file.display()))?;
    args.apply(&mut settings);

    let format = if settings.logging.json {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };
    init_subscriber(&settings.logging.level, format);

    let db_path = resolve_db_path(args.db_path.clone(), &settings, &tether_settings::data_dir());
    ensure_parent_dir(&db_path)?;

    let app = build_app(&settings, &db_path)?;

    let watchdog_cancel = CancellationToken::new();
    let watchdog_handle: JoinHandle<()> = tokio::spawn(app.watchdog.run(watchdog_cancel.clone()));

    let (addr, server_handle) = app
        .server
        .listen()
        .await
        .context("Failed to bind server")?;
    tracing::info!(
        max_sessions = app.orchestrator.max_concurrent_sessions(),
        "Tether agent listening on http://{addr}"
    );

    shutdown_signal().await?;

    tracing::info!("Shutting down...");
    watchdog_cancel.cancel();
    let report = app
        .server
        .shutdown()
        .graceful_shutdown(
            app.orchestrator.shutdown(app.shutdown_timeout),
            vec![server_handle, watchdog_handle],
            app.shutdown_timeout,
        )
        .await;

    tracing::info!(
        sessions_drained = report.sessions_drained,
        tasks_joined = report.tasks_joined,
        "Shutdown complete"
    );
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
