//! Orchestrator modules: per-session runner, approval gate, multi-session
//! coordination and the stale-session watchdog.

#[allow(clippy::module_inception)]
pub mod orchestrator;
pub mod session_runner;
pub mod tool_gate;
pub mod watchdog;

pub use orchestrator::{Orchestrator, StartSession};
pub use session_runner::{RunnerConfig, RunnerDeps, SessionRunner, SessionSpec};
pub use tool_gate::{GateOutcome, GateTiming, await_decision};
pub use watchdog::{STALE_SESSION_CATEGORY, SweepReport, Watchdog, WatchdogConfig};
