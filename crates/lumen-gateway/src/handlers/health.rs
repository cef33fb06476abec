//! Health check handlers.

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Liveness response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Package version.
    pub version: String,
}

/// Detailed health response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    /// Overall status.
    pub status: String,
    /// Presence store reachability.
    pub presence_store: String,
    /// Active WebSocket connections.
    pub ws_connections: usize,
    /// Users with at least one live connection.
    pub online_users: usize,
    /// Engine counters.
    pub metrics: MetricsSnapshot,
}

/// GET /api/health
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/health/detailed
pub async fn detailed_health(State(state): State<AppState>) -> Json<DetailedHealthResponse> {
    let store_healthy = state.presence.health_check().await;

    Json(DetailedHealthResponse {
        status: "ok".to_string(),
        presence_store: if store_healthy {
            "connected".to_string()
        } else {
            "unavailable".to_string()
        },
        ws_connections: state.engine.registry.connection_count(),
        online_users: state.engine.registry.user_count(),
        metrics: state.engine.metrics.snapshot(),
    })
}
