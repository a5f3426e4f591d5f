//! # tether-server
//!
//! axum HTTP surface for the copilot subsystem.
//!
//! - Chat start: creates a session and runs it in the background
//! - Resumable streams: SSE tail with `Last-Event-ID` resume, plus batch reads
//! - Tool confirmation: writes human decisions into the mailbox
//! - Checkpoints: create, list, rename, revert
//! - Live views: SSE fan-out of workflow reset notifications
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod errors;
pub mod health;
pub mod routes;
pub mod server;
pub mod shutdown;
pub mod stream;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use server::{AppState, ServerDeps, TetherServer};
pub use stream::LiveViewHub;
