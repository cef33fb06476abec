//! Best-effort presence tracking on top of the configured store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use lumen_core::config::presence::PresenceConfig;
use lumen_core::types::UserId;

use crate::keys::presence_key;
use crate::manager::PresenceManager;
use crate::store::PresenceStore;

/// Status value stored for a user with at least one live connection.
pub const STATUS_ONLINE: &str = "online";

/// Status value stored for a user whose last connection has closed.
pub const STATUS_OFFLINE: &str = "offline";

/// Tracks user online status in the presence store.
///
/// Every operation is best-effort: a store failure is logged and the
/// caller proceeds as if the user were offline. Connection handling must
/// never block on presence.
#[derive(Debug, Clone)]
pub struct PresenceTracker {
    store: Arc<PresenceManager>,
    /// TTL applied to `online` records.
    online_ttl: Duration,
}

impl PresenceTracker {
    /// Create a new tracker over the given store.
    pub fn new(store: Arc<PresenceManager>, config: &PresenceConfig) -> Self {
        Self {
            store,
            online_ttl: Duration::from_secs(config.online_ttl_seconds),
        }
    }

    /// Mark a user online with the configured TTL.
    pub async fn mark_online(&self, user_id: &UserId) {
        if let Err(e) = self
            .store
            .set(&presence_key(user_id), STATUS_ONLINE, self.online_ttl)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to mark user online");
        }
    }

    /// Mark a user offline. The record is written without a TTL so the
    /// explicit status survives until the next connect.
    pub async fn mark_offline(&self, user_id: &UserId) {
        if let Err(e) = self
            .store
            .set_persistent(&presence_key(user_id), STATUS_OFFLINE)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to mark user offline");
        }
    }

    /// Re-arm the online TTL for users that still hold live connections.
    pub async fn refresh(&self, user_ids: &[UserId]) {
        for user_id in user_ids {
            self.mark_online(user_id).await;
        }
    }

    /// Check whether a single user is online.
    pub async fn is_online(&self, user_id: &UserId) -> bool {
        match self.store.get(&presence_key(user_id)).await {
            Ok(value) => value.as_deref() == Some(STATUS_ONLINE),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Presence lookup failed, treating as offline");
                false
            }
        }
    }

    /// Bulk online-status query. A record that is absent, expired, or not
    /// `online` reads as offline, as does any store failure.
    pub async fn batch_status(&self, user_ids: &[UserId]) -> HashMap<UserId, bool> {
        let keys: Vec<String> = user_ids.iter().map(presence_key).collect();

        let values = match self.store.mget(&keys).await {
            Ok(values) => values,
            Err(e) => {
                warn!(error = %e, count = user_ids.len(), "Presence batch lookup failed, treating all as offline");
                vec![None; user_ids.len()]
            }
        };

        user_ids
            .iter()
            .zip(values)
            .map(|(user_id, value)| {
                (
                    user_id.clone(),
                    value.as_deref() == Some(STATUS_ONLINE),
                )
            })
            .collect()
    }

    /// Check that the underlying store is reachable.
    pub async fn health_check(&self) -> bool {
        match self.store.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!(error = %e, "Presence store health check failed");
                false
            }
        }
    }
}
