//! Handshake authentication: verifies the bearer credential and resolves
//! canonical identity before any session exists.

use std::sync::Arc;

use tracing::warn;

use lumen_auth::resolver::IdentityResolver;
use lumen_auth::verifier::TokenVerifier;
use lumen_core::result::AppResult;
use lumen_core::types::UserId;

/// Authenticated session identity extracted from the handshake.
#[derive(Debug, Clone)]
pub struct AuthenticatedConnection {
    /// Canonical user id (resolved profile id, or the raw token subject
    /// when no profile mapping exists).
    pub user_id: UserId,
    /// Email claim, if present.
    pub email: Option<String>,
}

/// Authenticates WebSocket handshakes.
#[derive(Clone)]
pub struct ConnectionAuthenticator {
    verifier: Arc<TokenVerifier>,
    resolver: Arc<dyn IdentityResolver>,
}

impl std::fmt::Debug for ConnectionAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionAuthenticator").finish()
    }
}

impl ConnectionAuthenticator {
    /// Creates a new authenticator.
    pub fn new(verifier: Arc<TokenVerifier>, resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { verifier, resolver }
    }

    /// Verifies the credential and attaches canonical identity.
    ///
    /// Verification failure rejects the connection. Identity resolution is
    /// best-effort: a lookup failure falls back to the raw subject.
    pub async fn authenticate(&self, token: &str) -> AppResult<AuthenticatedConnection> {
        let claims = self.verifier.verify(token)?;

        let user_id = match self.resolver.resolve(&claims.sub).await {
            Ok(Some(profile_id)) => profile_id,
            Ok(None) => claims.sub.clone(),
            Err(e) => {
                warn!(subject = %claims.sub, error = %e, "Identity resolution failed, using raw subject");
                claims.sub.clone()
            }
        };

        Ok(AuthenticatedConnection {
            user_id,
            email: claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;
    use jsonwebtoken::{EncodingKey, Header, encode};

    use lumen_auth::claims::Claims;
    use lumen_auth::resolver::StaticResolver;
    use lumen_core::config::auth::AuthConfig;

    const SECRET: &str = "handshake-test-secret";

    fn make_token(sub: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            email: Some("a@example.com".to_string()),
            iat: now,
            exp: now + 300,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn make_authenticator(resolver: Arc<dyn IdentityResolver>) -> ConnectionAuthenticator {
        let config = AuthConfig {
            jwt_secret: Some(SECRET.to_string()),
            ..Default::default()
        };
        ConnectionAuthenticator::new(Arc::new(TokenVerifier::new(&config)), resolver)
    }

    #[tokio::test]
    async fn test_resolves_profile_id() {
        let resolver = StaticResolver::new();
        resolver.insert("auth0|abc", "profile-9");
        let auth = make_authenticator(Arc::new(resolver));

        let session = auth.authenticate(&make_token("auth0|abc")).await.unwrap();
        assert_eq!(session.user_id, "profile-9");
        assert_eq!(session.email.as_deref(), Some("a@example.com"));
    }

    #[tokio::test]
    async fn test_falls_back_to_raw_subject() {
        let auth = make_authenticator(Arc::new(StaticResolver::new()));
        let session = auth.authenticate(&make_token("auth0|nomap")).await.unwrap();
        assert_eq!(session.user_id, "auth0|nomap");
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let auth = make_authenticator(Arc::new(StaticResolver::new()));
        assert!(auth.authenticate("not-a-jwt").await.is_err());
    }
}
