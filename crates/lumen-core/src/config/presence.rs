//! Presence store configuration.

use serde::{Deserialize, Serialize};

/// Top-level presence store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Presence provider type: `"memory"` or `"redis"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    /// TTL for `online` records in seconds. The TTL is the liveness
    /// mechanism for crash recovery: a gateway that dies without marking
    /// its users offline lets their records expire.
    #[serde(default = "default_online_ttl")]
    pub online_ttl_seconds: u64,
    /// Interval at which online TTLs are re-armed for users that still
    /// hold live connections, in seconds.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Redis-specific configuration.
    #[serde(default)]
    pub redis: RedisPresenceConfig,
    /// In-memory store configuration.
    #[serde(default)]
    pub memory: MemoryPresenceConfig,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            online_ttl_seconds: default_online_ttl(),
            refresh_interval_seconds: default_refresh_interval(),
            redis: RedisPresenceConfig::default(),
            memory: MemoryPresenceConfig::default(),
        }
    }
}

/// Redis presence backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisPresenceConfig {
    /// Redis connection URL.
    #[serde(default = "default_redis_url")]
    pub url: String,
    /// Key prefix for all gateway presence keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisPresenceConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// In-memory presence backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryPresenceConfig {
    /// Maximum number of entries in the store.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for MemoryPresenceConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_provider() -> String {
    "memory".to_string()
}

fn default_online_ttl() -> u64 {
    300
}

fn default_refresh_interval() -> u64 {
    60
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_key_prefix() -> String {
    "lumen:".to_string()
}

fn default_max_capacity() -> u64 {
    100000
}
