//! Presence manager that dispatches to the configured store backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use lumen_core::config::presence::PresenceConfig;
use lumen_core::error::AppError;
use lumen_core::result::AppResult;

use crate::store::PresenceStore;

/// Presence manager that wraps the configured store backend.
///
/// The backend is selected at construction time based on configuration.
#[derive(Debug, Clone)]
pub struct PresenceManager {
    /// The inner presence store.
    inner: Arc<dyn PresenceStore>,
}

impl PresenceManager {
    /// Create a new presence manager from configuration.
    pub async fn new(config: &PresenceConfig) -> AppResult<Self> {
        let inner: Arc<dyn PresenceStore> = match config.provider.as_str() {
            "redis" => {
                info!("Initializing Redis presence store");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisPresenceStore::new(client))
            }
            "memory" => {
                info!("Initializing in-memory presence store");
                Arc::new(crate::memory::MemoryPresenceStore::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown presence provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }

    /// Create a presence manager from an existing store (for testing).
    pub fn from_store(store: Arc<dyn PresenceStore>) -> Self {
        Self { inner: store }
    }
}

#[async_trait]
impl PresenceStore for PresenceManager {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.inner.set(key, value, ttl).await
    }

    async fn set_persistent(&self, key: &str, value: &str) -> AppResult<()> {
        self.inner.set_persistent(key, value).await
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        self.inner.mget(keys).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn health_check(&self) -> AppResult<bool> {
        self.inner.health_check().await
    }
}
