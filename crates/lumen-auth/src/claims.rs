//! JWT claims carried by the handshake credential.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Claims payload embedded in every handshake token.
///
/// The token is issued by the platform's auth service; the gateway only
/// verifies and reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject, the external authentication id.
    pub sub: String,
    /// Email address, when the auth provider supplies one.
    #[serde(default)]
    pub email: Option<String>,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}
