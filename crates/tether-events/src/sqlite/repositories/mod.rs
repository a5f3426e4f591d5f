//! Stateless repositories. Each method takes `&Connection` and runs SQL;
//! transactions are opened by the stores.

pub mod checkpoint;
pub mod decision;
pub mod event;
pub mod session;
pub mod workflow;
