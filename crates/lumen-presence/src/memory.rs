//! In-memory presence store using the moka crate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use lumen_core::config::presence::MemoryPresenceConfig;
use lumen_core::result::AppResult;

use crate::store::PresenceStore;

/// A stored value together with its per-entry TTL.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    ttl: Option<Duration>,
}

/// Per-entry expiry policy: entries carry their own TTL, persistent
/// entries never expire.
struct EntryExpiry;

impl Expiry<String, Entry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// In-memory presence store provider, for development and tests.
#[derive(Clone)]
pub struct MemoryPresenceStore {
    cache: Cache<String, Entry>,
}

impl std::fmt::Debug for MemoryPresenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPresenceStore").finish()
    }
}

impl MemoryPresenceStore {
    /// Create a new in-memory store from configuration.
    pub fn new(config: &MemoryPresenceConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .expire_after(EntryExpiry)
            .build();

        Self { cache }
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl: Some(ttl),
                },
            )
            .await;
        Ok(())
    }

    async fn set_persistent(&self, key: &str, value: &str) -> AppResult<()> {
        self.cache
            .insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    ttl: None,
                },
            )
            .await;
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.cache.get(key).await.map(|entry| entry.value))
    }

    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.cache.get(key).await.map(|entry| entry.value));
        }
        Ok(values)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.remove(key).await;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store() -> MemoryPresenceStore {
        MemoryPresenceStore::new(&MemoryPresenceConfig { max_capacity: 1000 })
    }

    #[tokio::test]
    async fn test_set_get() {
        let store = make_store();
        store
            .set("presence:u1", "online", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get("presence:u1").await.unwrap(),
            Some("online".to_string())
        );
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = make_store();
        store
            .set("presence:u1", "online", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get("presence:u1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persistent_entry_survives() {
        let store = make_store();
        store
            .set_persistent("presence:u1", "offline")
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            store.get("presence:u1").await.unwrap(),
            Some("offline".to_string())
        );
    }

    #[tokio::test]
    async fn test_mget_preserves_key_order() {
        let store = make_store();
        store
            .set("presence:u2", "online", Duration::from_secs(60))
            .await
            .unwrap();

        let values = store
            .mget(&[
                "presence:u1".to_string(),
                "presence:u2".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(values, vec![None, Some("online".to_string())]);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = make_store();
        store
            .set("presence:u1", "online", Duration::from_secs(60))
            .await
            .unwrap();
        store.delete("presence:u1").await.unwrap();
        assert_eq!(store.get("presence:u1").await.unwrap(), None);
    }
}
