//! Lumen Realtime Gateway
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use lumen_auth::resolver::resolver_from_config;
use lumen_auth::verifier::TokenVerifier;
use lumen_core::config::AppConfig;
use lumen_core::error::AppError;
use lumen_gateway::connection::authenticator::ConnectionAuthenticator;
use lumen_gateway::engine::GatewayEngine;
use lumen_gateway::push::push_sender_from_config;
use lumen_gateway::router::build_router;
use lumen_gateway::state::AppState;
use lumen_presence::{PresenceManager, PresenceTracker};

#[tokio::main]
async fn main() {
    let env = std::env::var("LUMEN_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match load_configuration(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, &env).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Load and validate configuration from files and environment
fn load_configuration(env: &str) -> Result<AppConfig, AppError> {
    let config = AppConfig::load(env)?;
    config.validate(env)?;
    Ok(config)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig, env: &str) -> Result<(), AppError> {
    tracing::info!(
        env = %env,
        "Starting Lumen gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Presence store
    tracing::info!(provider = %config.presence.provider, "Initializing presence store");
    let presence_manager = Arc::new(PresenceManager::new(&config.presence).await?);
    let presence = Arc::new(PresenceTracker::new(presence_manager, &config.presence));

    // Handshake authentication
    let verifier = Arc::new(TokenVerifier::new(&config.auth));
    let resolver = resolver_from_config(&config.auth)?;
    let authenticator = ConnectionAuthenticator::new(verifier, resolver);

    // Push notifications
    let push = push_sender_from_config(&config.push)?;

    // Gateway engine
    let engine = Arc::new(GatewayEngine::new(
        config.gateway.clone(),
        Arc::clone(&presence),
        push,
    ));

    // Background maintenance: presence TTL refresh + call-session pruning
    let maintenance_engine = Arc::clone(&engine);
    let mut maintenance_shutdown = engine.shutdown_receiver();
    let refresh_interval = Duration::from_secs(config.presence.refresh_interval_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(refresh_interval);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    maintenance_engine.run_maintenance_cycle().await;
                }
                _ = maintenance_shutdown.recv() => {
                    break;
                }
            }
        }
    });

    let state = AppState {
        config: Arc::new(config.clone()),
        engine: Arc::clone(&engine),
        authenticator,
        presence,
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Lumen gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    tracing::info!("Shutdown signal received, closing connections");
    engine.shutdown().await;

    tracing::info!("Lumen gateway shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => {
                tracing::error!("Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
