//! # tether-core
//!
//! Foundation types shared by every tether crate.
//!
//! - **Branded IDs**: `SessionId`, `ToolCallId`, `WorkflowId`, `CheckpointId`, `BlockId`
//! - **Copilot events**: the tagged [`events::CopilotEvent`] payload carried by the session log
//! - **Status enums**: [`status::SessionStatus`] and [`status::DecisionStatus`]
//! - **Workflow graph**: [`workflow::WorkflowState`] plus the portable snapshot codec
//! - **Logging**: `tracing` subscriber setup and log capture for tests

#![deny(unsafe_code)]

pub mod events;
pub mod ids;
pub mod logging;
pub mod status;
pub mod workflow;

pub use events::{CopilotEvent, ToolOutcome};
pub use ids::{BlockId, CheckpointId, SessionId, ToolCallId, WorkflowId};
pub use status::{DecisionStatus, SessionStatus};
