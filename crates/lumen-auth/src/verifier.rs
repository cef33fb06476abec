//! Handshake token verification.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use tracing::warn;

use lumen_core::config::auth::AuthConfig;
use lumen_core::error::AppError;

use super::claims::Claims;

/// Verifies handshake JWTs against the configured secret.
///
/// When no secret is configured the verifier decodes tokens without
/// signature verification, still enforcing expiry. That mode is only
/// reachable outside production: [`lumen_core::config::AppConfig::validate`]
/// refuses to start a production gateway without a secret.
#[derive(Clone)]
pub struct TokenVerifier {
    /// HMAC key, present when a secret is configured.
    decoding_key: Option<DecodingKey>,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("verifying", &self.decoding_key.is_some())
            .finish()
    }
}

impl TokenVerifier {
    /// Creates a new verifier from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = config.leeway_seconds;

        let decoding_key = match &config.jwt_secret {
            Some(secret) => Some(DecodingKey::from_secret(secret.as_bytes())),
            None => {
                validation.insecure_disable_signature_validation();
                None
            }
        };

        Self {
            decoding_key,
            validation,
        }
    }

    /// Verifies a handshake token and returns its claims.
    ///
    /// With a configured secret this checks signature and expiry; without
    /// one it decodes unverified (expiry still enforced) and logs a warning.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let key = match &self.decoding_key {
            Some(key) => key.clone(),
            None => {
                warn!("No JWT secret configured, accepting token without signature verification");
                DecodingKey::from_secret(&[])
            }
        };

        let token_data = decode::<Claims>(token, &key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::authentication("Token has expired")
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    AppError::authentication("Invalid token format")
                }
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    AppError::authentication("Invalid token signature")
                }
                _ => AppError::authentication(format!("Token validation failed: {e}")),
            }
        })?;

        Ok(token_data.claims)
    }
}
