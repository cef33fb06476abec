//! Redis presence store implementation.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use lumen_core::error::{AppError, ErrorKind};
use lumen_core::result::AppResult;

use crate::store::PresenceStore;

use super::client::RedisClient;

/// Redis-backed presence store.
///
/// TTLs map directly to key expiry, so a record left behind by a crashed
/// gateway disappears on its own.
#[derive(Debug, Clone)]
pub struct RedisPresenceStore {
    /// Redis client.
    client: RedisClient,
}

impl RedisPresenceStore {
    /// Create a new Redis presence store.
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    /// Map a Redis error to an AppError.
    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Presence, format!("Redis error: {e}"), e)
    }
}

#[async_trait]
impl PresenceStore for RedisPresenceStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn
            .set_ex(&full_key, value, ttl.as_secs())
            .await
            .map_err(Self::map_err)?;
        Ok(())
    }

    async fn set_persistent(&self, key: &str, value: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.set(&full_key, value).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let result: Option<String> = conn.get(&full_key).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn mget(&self, keys: &[String]) -> AppResult<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.client.conn_mut();
        let mut cmd = redis::cmd("MGET");
        for key in keys {
            cmd.arg(self.client.prefixed_key(key));
        }

        let result: Vec<Option<String>> =
            cmd.query_async(&mut conn).await.map_err(Self::map_err)?;
        Ok(result)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let full_key = self.client.prefixed_key(key);
        let mut conn = self.client.conn_mut();
        let _: () = conn.del(&full_key).await.map_err(Self::map_err)?;
        Ok(())
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;
        Ok(pong == "PONG")
    }
}
