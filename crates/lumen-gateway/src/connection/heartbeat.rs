//! Application-level ping/pong heartbeat.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{debug, warn};

use lumen_core::config::gateway::GatewayConfig;

use super::handle::ConnectionHandle;

/// Heartbeat timing configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Silence threshold before the connection is considered dead.
    pub ping_timeout: Duration,
}

impl From<&GatewayConfig> for HeartbeatConfig {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(config.ping_timeout_seconds),
        }
    }
}

/// Runs the heartbeat loop for one connection.
///
/// Sends periodic pings and marks the connection closed when no pong
/// arrives within the timeout. Ends when the connection dies.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    // The first tick fires immediately; skip it so a fresh connection is
    // not pinged before the client finishes its handshake.
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let last_pong = *handle.last_pong.read().await;
        let elapsed = Utc::now() - last_pong;

        if let Ok(elapsed_std) = elapsed.to_std() {
            if elapsed_std > config.ping_timeout {
                warn!(
                    conn_id = %handle.id,
                    elapsed = ?elapsed_std,
                    "Heartbeat timeout, closing connection"
                );
                handle.mark_closed();
                break;
            }
        }

        let ping = crate::event::ServerEvent::Ping {
            timestamp: Utc::now().timestamp_millis(),
        };
        if !handle.send(&ping) {
            handle.mark_closed();
            break;
        }
    }

    debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
