//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod auth;
pub mod gateway;
pub mod logging;
pub mod presence;
pub mod push;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::auth::AuthConfig;
use self::gateway::GatewayConfig;
use self::logging::LoggingConfig;
use self::presence::PresenceConfig;
use self::push::PushConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP/WebSocket server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Handshake authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Presence store settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Gateway engine settings.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Push notification settings.
    #[serde(default)]
    pub push: PushConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `LUMEN__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("LUMEN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Validate cross-section constraints that serde defaults cannot express.
    ///
    /// In a production environment a JWT secret is mandatory: the gateway
    /// must never accept unverified handshake credentials there.
    pub fn validate(&self, env: &str) -> Result<(), AppError> {
        if env == "production" && self.auth.jwt_secret.is_none() {
            return Err(AppError::configuration(
                "auth.jwt_secret is required in production",
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            presence: PresenceConfig::default(),
            gateway: GatewayConfig::default(),
            push: PushConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
