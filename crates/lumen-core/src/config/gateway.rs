//! Gateway engine configuration.

use serde::{Deserialize, Serialize};

/// Gateway (WebSocket) engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Maximum WebSocket connections per user. At the cap the oldest
    /// connection is evicted.
    #[serde(default = "default_max_connections_per_user")]
    pub max_connections_per_user: usize,
    /// Per-connection outbound channel buffer size.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Application-level ping interval in seconds.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Ping timeout in seconds; a connection with no pong inside the
    /// timeout is considered dead.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_seconds: u64,
    /// Maximum age of an unterminated call session before it is pruned,
    /// in seconds.
    #[serde(default = "default_call_session_max_age")]
    pub call_session_max_age_seconds: i64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_connections_per_user: default_max_connections_per_user(),
            channel_buffer_size: default_channel_buffer(),
            ping_interval_seconds: default_ping_interval(),
            ping_timeout_seconds: default_ping_timeout(),
            call_session_max_age_seconds: default_call_session_max_age(),
        }
    }
}

fn default_max_connections_per_user() -> usize {
    8
}

fn default_channel_buffer() -> usize {
    256
}

fn default_ping_interval() -> u64 {
    30
}

fn default_ping_timeout() -> u64 {
    60
}

fn default_call_session_max_age() -> i64 {
    3600
}
