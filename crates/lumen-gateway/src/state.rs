//! Application state shared across all handlers.

use std::sync::Arc;

use lumen_core::config::AppConfig;
use lumen_presence::PresenceTracker;

use crate::connection::authenticator::ConnectionAuthenticator;
use crate::engine::GatewayEngine;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The gateway engine.
    pub engine: Arc<GatewayEngine>,
    /// Handshake authenticator.
    pub authenticator: ConnectionAuthenticator,
    /// Presence tracker (shared with the engine).
    pub presence: Arc<PresenceTracker>,
}
