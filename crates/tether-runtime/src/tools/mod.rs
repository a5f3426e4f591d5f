//! Tool boundary: the [`CopilotTool`] trait and its registry.

pub mod registry;
pub mod traits;

pub use registry::ToolRegistry;
pub use traits::{CopilotTool, ToolContext};
