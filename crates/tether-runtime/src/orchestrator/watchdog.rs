//! Periodic sweep: fails sessions stuck in `running`, purges expired
//! sessions and expired mailbox entries.

use std::sync::Arc;
use std::time::Duration;

use tether_events::{EventStore, EventStoreError};
use tether_settings::TetherSettings;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::orchestrator::Orchestrator;
use crate::mailbox::Mailbox;

/// Category recorded on sessions failed by the sweep.
pub const STALE_SESSION_CATEGORY: &str = "stale_session";

/// Sweep timing.
#[derive(Clone, Copy, Debug)]
pub struct WatchdogConfig {
    /// A `running` session older than this with no live runner is failed.
    pub max_session_age: Duration,
    /// Terminal sessions idle longer than this are deleted.
    pub retention_grace: Duration,
    /// Delay between sweeps.
    pub interval: Duration,
}

impl WatchdogConfig {
    /// Build from settings.
    pub fn from_settings(settings: &TetherSettings) -> Self {
        Self {
            max_session_age: settings.copilot.max_session_age(),
            retention_grace: settings.stream.retention_grace(),
            interval: settings.copilot.watchdog_interval(),
        }
    }
}

/// What one sweep did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Stale sessions moved to `error`.
    pub stale_failed: usize,
    /// Terminal sessions deleted.
    pub sessions_purged: usize,
    /// Expired decisions deleted.
    pub decisions_purged: usize,
}

/// Background janitor for the event log and mailbox.
pub struct Watchdog {
    event_store: EventStore,
    mailbox: Arc<dyn Mailbox>,
    orchestrator: Arc<Orchestrator>,
    config: WatchdogConfig,
}

impl Watchdog {
    /// Create a watchdog.
    pub fn new(
        event_store: EventStore,
        mailbox: Arc<dyn Mailbox>,
        orchestrator: Arc<Orchestrator>,
        config: WatchdogConfig,
    ) -> Self {
        Self {
            event_store,
            mailbox,
            orchestrator,
            config,
        }
    }

    /// Run one sweep. Each stage logs and continues past its own failure.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.event_store.list_stale_running(self.config.max_session_age) {
            Ok(stale) => {
                for meta in stale {
                    if self.orchestrator.is_active(&meta.session_id) {
                        continue;
                    }
                    match self.event_store.fail_session(
                        &meta.session_id,
                        STALE_SESSION_CATEGORY,
                        "session exceeded its maximum age without finishing",
                    ) {
                        Ok(_) => {
                            warn!(session_id = %meta.session_id, "failed stale session");
                            report.stale_failed += 1;
                        }
                        // Finished between the listing and the write.
                        Err(EventStoreError::SessionClosed(_) | EventStoreError::InvalidTransition { .. }) => {}
                        Err(e) => warn!(session_id = %meta.session_id, error = %e, "could not fail stale session"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "stale session scan failed"),
        }

        match self.event_store.purge_expired_sessions(self.config.retention_grace) {
            Ok(n) => report.sessions_purged = n,
            Err(e) => warn!(error = %e, "session purge failed"),
        }

        match self.mailbox.purge_expired().await {
            Ok(n) => report.decisions_purged = n,
            Err(e) => warn!(error = %e, "mailbox purge failed"),
        }

        debug!(?report, "watchdog sweep");
        report
    }

    /// Sweep on an interval until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = self.config.interval.as_millis(), "watchdog started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let _ = self.sweep().await;
                }
            }
        }
        info!("watchdog stopped");
    }
}
