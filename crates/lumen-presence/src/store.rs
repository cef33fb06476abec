//! Presence store trait for pluggable backends.

use std::time::Duration;

use async_trait::async_trait;

use lumen_core::result::AppResult;

/// Trait for presence store backends (Redis or in-memory).
///
/// Values are plain strings; TTL enforcement is the backend's
/// responsibility. A record set with a TTL silently expires when the
/// owning gateway dies without cleanup; that expiry is the crash-recovery
/// liveness mechanism.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Set a value with a TTL.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Set a value with no expiry.
    async fn set_persistent(&self, key: &str, value: &str) -> AppResult<()>;

    /// Get a value by key. Returns `None` if the key does not exist or has
    /// expired.
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Get many values at once, in key order.
    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> AppResult<bool>;
}
