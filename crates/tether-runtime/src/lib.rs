//! # tether-runtime
//!
//! Copilot session execution, tool-call approval, and checkpoint/revert.
//!
//! - **Session runner**: call model -> stream deltas -> gate and execute tools -> record events
//! - **Tool gate**: bounded mailbox polling for a human decision, timeout counts as rejection
//! - **Mailbox**: TTL'd decision handoff, in-memory or `SQLite`-backed
//! - **Orchestrator**: background session tasks, concurrency cap, graceful shutdown
//! - **Watchdog**: fails orphaned sessions and purges expired state
//! - **Checkpoints**: snapshot before agent mutation, revert with fresh ids

#![deny(unsafe_code)]

pub mod checkpoint;
pub mod errors;
pub mod mailbox;
pub mod model;
pub mod orchestrator;
pub mod tools;

pub use errors::{CheckpointError, MailboxError, ModelError, RuntimeError, ToolError};
pub use mailbox::{Mailbox, MemoryMailbox, SqliteMailbox};
pub use model::{ModelClient, StepContext, StepOutput, ToolCallRequest, ToolResultMessage};
pub use orchestrator::{Orchestrator, StartSession, Watchdog, WatchdogConfig};
pub use tools::{CopilotTool, ToolContext, ToolRegistry};
