//! Push notification configuration.

use serde::{Deserialize, Serialize};

/// Push notification sender configuration.
///
/// The sender is best-effort: failures are logged and never surfaced to
/// the signaling path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    /// Whether push delivery is enabled. When disabled a no-op sender
    /// is used.
    #[serde(default)]
    pub enabled: bool,
    /// Endpoint of the push delivery service.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer credential presented to the push service.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    5
}
