//! Handshake authentication configuration.

use serde::{Deserialize, Serialize};

/// Authentication configuration for the WebSocket handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret key for JWT verification (HMAC-SHA256).
    ///
    /// When absent, the verifier decodes tokens without signature
    /// verification, allowed only outside production (fail open, logged).
    /// [`crate::config::AppConfig::validate`] rejects a missing secret in
    /// production (fail closed).
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Clock-skew leeway for expiry checks, in seconds.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
    /// Base URL of the profile service used to map an auth subject to a
    /// canonical profile id. When absent, the raw subject is used as-is.
    #[serde(default)]
    pub profile_lookup_url: Option<String>,
    /// Timeout for profile lookups in seconds.
    #[serde(default = "default_lookup_timeout")]
    pub profile_lookup_timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            leeway_seconds: default_leeway(),
            profile_lookup_url: None,
            profile_lookup_timeout_seconds: default_lookup_timeout(),
        }
    }
}

fn default_leeway() -> u64 {
    5
}

fn default_lookup_timeout() -> u64 {
    3
}
