//! Bulk presence query handler.

use std::collections::HashMap;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};

use lumen_core::error::AppError;
use lumen_core::types::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for a bulk online-status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStatusRequest {
    /// Users to query.
    pub user_ids: Vec<UserId>,
}

/// Response body mapping each queried user to their online status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceStatusResponse {
    /// Online status per queried user.
    pub statuses: HashMap<UserId, bool>,
}

/// POST /api/presence/status
///
/// Bearer-authenticated: other backend services and clients query the
/// online status of a batch of users.
pub async fn presence_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PresenceStatusRequest>,
) -> Result<Json<PresenceStatusResponse>, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::authentication("Missing bearer credential"))?;
    state.authenticator.authenticate(&token).await?;

    let statuses = state.presence.batch_status(&request.user_ids).await;
    Ok(Json(PresenceStatusResponse { statuses }))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}
