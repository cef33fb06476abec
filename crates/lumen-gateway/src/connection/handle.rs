//! Individual WebSocket connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

use lumen_core::types::{ConnectionId, UserId};

use crate::event::ServerEvent;

/// A handle to a single WebSocket connection.
///
/// Holds the sender channel for pushing frames to the client, plus the
/// authenticated identity of the session. Owned by the registry for the
/// connection's lifetime.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Canonical user id attached at handshake.
    pub user_id: UserId,
    /// Email claim from the handshake credential, if present.
    pub email: Option<String>,
    /// Sender for serialized outbound frames.
    pub sender: mpsc::Sender<String>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last pong received.
    pub last_pong: tokio::sync::RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Creates a new connection handle.
    pub fn new(user_id: UserId, email: Option<String>, sender: mpsc::Sender<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            email,
            sender,
            connected_at: now,
            last_pong: tokio::sync::RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Sends a pre-serialized frame to this connection.
    ///
    /// Returns `false` if the frame was dropped (buffer full or
    /// connection closed).
    pub fn send_raw(&self, frame: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(frame) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(conn_id = %self.id, "Send buffer full, dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Serializes and sends an event to this connection.
    pub fn send(&self, event: &ServerEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(frame) => self.send_raw(frame),
            Err(e) => {
                error!(conn_id = %self.id, error = %e, "Failed to serialize outbound event");
                false
            }
        }
    }

    /// Checks if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Marks the connection as closed.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Records a pong response.
    pub async fn record_pong(&self) {
        let mut lp = self.last_pong.write().await;
        *lp = Utc::now();
    }
}
