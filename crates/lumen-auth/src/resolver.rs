//! Identity resolution: maps an authentication subject to a canonical
//! profile id.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;

use lumen_core::config::auth::AuthConfig;
use lumen_core::error::AppError;
use lumen_core::types::UserId;

/// Resolves an authentication subject to the canonical user identifier.
///
/// Returns `Ok(None)` when no profile mapping exists; the gateway then
/// falls back to the raw subject. Resolution failures are surfaced as
/// errors so the caller can decide to fall back (best-effort) rather
/// than reject the connection.
#[async_trait]
pub trait IdentityResolver: Send + Sync + std::fmt::Debug + 'static {
    /// Looks up the profile id for an auth subject.
    async fn resolve(&self, subject: &str) -> Result<Option<UserId>, AppError>;
}

/// Resolver that never maps, so every subject is used as-is.
#[derive(Debug, Default)]
pub struct PassthroughResolver;

#[async_trait]
impl IdentityResolver for PassthroughResolver {
    async fn resolve(&self, _subject: &str) -> Result<Option<UserId>, AppError> {
        Ok(None)
    }
}

/// In-memory subject → profile map, for development and tests.
#[derive(Debug, Default)]
pub struct StaticResolver {
    mappings: DashMap<String, UserId>,
}

impl StaticResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self {
            mappings: DashMap::new(),
        }
    }

    /// Registers a subject → profile mapping.
    pub fn insert(&self, subject: impl Into<String>, profile_id: impl Into<UserId>) {
        self.mappings.insert(subject.into(), profile_id.into());
    }
}

#[async_trait]
impl IdentityResolver for StaticResolver {
    async fn resolve(&self, subject: &str) -> Result<Option<UserId>, AppError> {
        Ok(self.mappings.get(subject).map(|entry| entry.value().clone()))
    }
}

/// Profile service response shape.
#[derive(Debug, Deserialize)]
struct ProfileLookupResponse {
    #[serde(rename = "profileId")]
    profile_id: UserId,
}

/// Resolver backed by the platform's profile service over HTTP.
#[derive(Debug)]
pub struct HttpIdentityResolver {
    client: reqwest::Client,
    base_url: String,
}

impl HttpIdentityResolver {
    /// Creates a resolver against the given profile service base URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::external(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for HttpIdentityResolver {
    async fn resolve(&self, subject: &str) -> Result<Option<UserId>, AppError> {
        let url = format!(
            "{}/internal/profiles/by-subject/{}",
            self.base_url,
            urlencode(subject)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::external(format!("Profile lookup failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = response
            .error_for_status()
            .map_err(|e| AppError::external(format!("Profile lookup failed: {e}")))?;

        let body: ProfileLookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::external(format!("Malformed profile response: {e}")))?;

        Ok(Some(body.profile_id))
    }
}

/// Builds the configured identity resolver.
pub fn resolver_from_config(config: &AuthConfig) -> Result<Arc<dyn IdentityResolver>, AppError> {
    match &config.profile_lookup_url {
        Some(url) => {
            info!(url = %url, "Using HTTP identity resolver");
            Ok(Arc::new(HttpIdentityResolver::new(
                url,
                Duration::from_secs(config.profile_lookup_timeout_seconds),
            )?))
        }
        None => Ok(Arc::new(PassthroughResolver)),
    }
}

/// Minimal percent-encoding for path segments (auth subjects may contain
/// `|` and other reserved characters).
fn urlencode(segment: &str) -> String {
    segment
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            other => format!("%{other:02X}"),
        })
        .collect()
}
