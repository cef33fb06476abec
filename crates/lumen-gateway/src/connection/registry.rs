//! Socket registry: all live connections indexed by user and by id.
//!
//! The registry is process-local by contract: "deliver to user" fans out
//! across the devices connected to this instance only. First/last
//! determination for a user happens under the per-user entry lock so a
//! reconnect storm cannot lose a concurrent connect.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::error;

use lumen_core::types::{ConnectionId, UserId};

use crate::event::ServerEvent;

use super::handle::ConnectionHandle;

/// Thread-safe registry of all active WebSocket connections.
#[derive(Debug, Default)]
pub struct SocketRegistry {
    /// User ID → connection handles (one user can have multiple devices).
    by_user: DashMap<UserId, Vec<Arc<ConnectionHandle>>>,
    /// Connection ID → handle for direct addressing.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl SocketRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection. Returns `true` if it is the user's first live
    /// connection (presence 0→1 transition).
    pub fn add(&self, handle: Arc<ConnectionHandle>) -> bool {
        self.by_id.insert(handle.id, handle.clone());
        let mut connections = self.by_user.entry(handle.user_id.clone()).or_default();
        let first = connections.is_empty();
        connections.push(handle);
        first
    }

    /// Removes a connection. Returns the handle and whether it was the
    /// user's last live connection (presence 1→0 transition).
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<(Arc<ConnectionHandle>, bool)> {
        let (_, handle) = self.by_id.remove(conn_id)?;

        let mut last = false;
        if let Some(mut connections) = self.by_user.get_mut(&handle.user_id) {
            connections.retain(|c| c.id != *conn_id);
            last = connections.is_empty();
        }
        // Conditional removal so a concurrent add cannot be lost between
        // the emptiness check and the map removal.
        self.by_user
            .remove_if(&handle.user_id, |_, connections| connections.is_empty());

        Some((handle, last))
    }

    /// Returns all live connections for a user. Empty means "no-op
    /// delivery", never an error.
    pub fn connections_for(&self, user_id: &UserId) -> Vec<Arc<ConnectionHandle>> {
        self.by_user
            .get(user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Returns a specific connection by id.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Returns all connected user IDs.
    pub fn connected_user_ids(&self) -> Vec<UserId> {
        self.by_user.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Number of unique connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Delivers an event to the given connections, serializing once.
    /// Returns the number of frames actually sent.
    pub fn send_to_connections(
        &self,
        conn_ids: &[ConnectionId],
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    ) -> u64 {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                error!(error = %e, "Failed to serialize outbound event");
                return 0;
            }
        };

        let mut sent = 0u64;
        for conn_id in conn_ids {
            if Some(*conn_id) == exclude {
                continue;
            }
            if let Some(handle) = self.get(conn_id) {
                if handle.send_raw(frame.clone()) {
                    sent += 1;
                }
            }
        }
        sent
    }

    /// Fans an event out to every live connection of a user. Returns the
    /// number of frames sent; zero means the user is unreachable here.
    pub fn send_to_user(&self, user_id: &UserId, event: &ServerEvent) -> u64 {
        let conn_ids: Vec<ConnectionId> = self
            .connections_for(user_id)
            .iter()
            .map(|h| h.id)
            .collect();
        self.send_to_connections(&conn_ids, event, None)
    }

    /// Broadcasts an event to every connection except, optionally, one.
    pub fn broadcast_all(&self, event: &ServerEvent, exclude: Option<ConnectionId>) -> u64 {
        let conn_ids: Vec<ConnectionId> =
            self.by_id.iter().map(|entry| *entry.key()).collect();
        self.send_to_connections(&conn_ids, event, exclude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_handle(user_id: &str) -> Arc<ConnectionHandle> {
        let (tx, _rx) = mpsc::channel(4);
        // Receiver dropped; registry bookkeeping does not send.
        Arc::new(ConnectionHandle::new(user_id.to_string(), None, tx))
    }

    #[test]
    fn test_first_and_last_transitions() {
        let registry = SocketRegistry::new();
        let a = make_handle("u1");
        let b = make_handle("u1");

        assert!(registry.add(a.clone()));
        assert!(!registry.add(b.clone()));

        let (_, last) = registry.remove(&a.id).unwrap();
        assert!(!last);
        let (_, last) = registry.remove(&b.id).unwrap();
        assert!(last);

        assert_eq!(registry.user_count(), 0);
        assert_eq!(registry.connection_count(), 0);
    }

    #[test]
    fn test_connections_for_multi_device() {
        let registry = SocketRegistry::new();
        let a = make_handle("u1");
        let b = make_handle("u1");
        let c = make_handle("u2");
        registry.add(a.clone());
        registry.add(b.clone());
        registry.add(c);

        let conns = registry.connections_for(&"u1".to_string());
        assert_eq!(conns.len(), 2);
        assert!(conns.iter().any(|h| h.id == a.id));
        assert!(conns.iter().any(|h| h.id == b.id));

        assert!(registry.connections_for(&"ghost".to_string()).is_empty());
    }

    #[test]
    fn test_remove_unknown_connection_is_none() {
        let registry = SocketRegistry::new();
        assert!(registry.remove(&uuid::Uuid::new_v4()).is_none());
    }

    #[tokio::test]
    async fn test_send_to_user_fans_out_to_all_devices() {
        let registry = SocketRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        registry.add(Arc::new(ConnectionHandle::new("u1".to_string(), None, tx_a)));
        registry.add(Arc::new(ConnectionHandle::new("u1".to_string(), None, tx_b)));

        let event = ServerEvent::Ping { timestamp: 5 };
        assert_eq!(registry.send_to_user(&"u1".to_string(), &event), 2);
        assert!(rx_a.recv().await.unwrap().contains("\"ping\""));
        assert!(rx_b.recv().await.unwrap().contains("\"ping\""));

        assert_eq!(registry.send_to_user(&"ghost".to_string(), &event), 0);
    }

    #[tokio::test]
    async fn test_broadcast_all_respects_exclude() {
        let registry = SocketRegistry::new();
        let (tx_a, mut rx_a) = mpsc::channel(4);
        let (tx_b, mut rx_b) = mpsc::channel(4);
        let a = Arc::new(ConnectionHandle::new("u1".to_string(), None, tx_a));
        let b = Arc::new(ConnectionHandle::new("u2".to_string(), None, tx_b));
        registry.add(a.clone());
        registry.add(b);

        let event = ServerEvent::Ping { timestamp: 5 };
        assert_eq!(registry.broadcast_all(&event, Some(a.id)), 1);
        assert!(rx_b.recv().await.is_some());
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn test_get_by_connection_id() {
        let registry = SocketRegistry::new();
        let a = make_handle("u1");
        registry.add(a.clone());
        assert_eq!(registry.get(&a.id).unwrap().id, a.id);
        registry.remove(&a.id);
        assert!(registry.get(&a.id).is_none());
    }
}
