//! Workflow graph model and its portable snapshot form.

pub mod registry;
pub mod snapshot;
pub mod state;

pub use registry::BlockRegistry;
pub use snapshot::{SnapshotError, parse_workflow_state_text, serialize_workflow_state};
pub use state::{Block, Edge, Loop, Parallel, Position, WorkflowShape, WorkflowState};
