//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use lumen_core::error::AppError;

use crate::connection::authenticator::AuthenticatedConnection;
use crate::connection::heartbeat::run_heartbeat;
use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token. Browsers cannot set headers on WebSocket
    /// upgrades, so the query is the primary credential channel.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}, the WebSocket upgrade endpoint.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = query
        .token
        .or_else(|| bearer_token(&headers))
        .ok_or_else(|| AppError::authentication("Missing credential"))?;

    // Authenticate before upgrade
    let auth = state.authenticator.authenticate(&token).await?;

    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, auth, socket)))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.to_string())
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, auth: AuthenticatedConnection, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state
        .engine
        .register(auth.user_id.clone(), auth.email)
        .await;
    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %auth.user_id,
        "WebSocket connection established"
    );

    // Spawn outbound message forwarder
    let outbound_task = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if ws_tx.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // Spawn application-level heartbeat
    let mut heartbeat_task = tokio::spawn(run_heartbeat(
        handle.clone(),
        state.engine.heartbeat_config(),
    ));

    // Process inbound messages sequentially so per-connection ordering
    // is preserved. The heartbeat finishing also ends the loop: a
    // half-open socket may never yield another frame, and a timed-out
    // connection still has to reach the deregister path below.
    loop {
        let result = tokio::select! {
            _ = &mut heartbeat_task => break,
            inbound = ws_rx.next() => match inbound {
                Some(result) => result,
                None => break,
            },
        };
        if !handle.is_alive() {
            break;
        }
        match result {
            Ok(Message::Text(text)) => {
                state.engine.handle_event(&conn_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => {
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup
    outbound_task.abort();
    heartbeat_task.abort();
    state.engine.deregister(&conn_id).await;

    info!(
        conn_id = %conn_id,
        user_id = %auth.user_id,
        "WebSocket connection closed"
    );
}
