//! Integration tests for the HTTP surface and connection lifecycle.

use http::StatusCode;
use serde_json::json;

use crate::helpers::{self, TestApp};

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_check() {
    let app = TestApp::new();

    let response = app.request("GET", "/api/health/detailed", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["presenceStore"], "connected");
    assert_eq!(response.body["wsConnections"], 0);
    assert!(response.body.get("metrics").is_some());
}

#[tokio::test]
async fn test_ws_upgrade_without_token() {
    let app = TestApp::new();

    let response = app.ws_request("/ws").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_ws_upgrade_with_garbage_token() {
    let app = TestApp::new();

    let response = app.ws_request("/ws?token=not-a-jwt").await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_connection_counts_surface_in_health() {
    let app = TestApp::new();

    let (_handle, _rx) = app.engine.register("u1".to_string(), None).await;

    let response = app.request("GET", "/api/health/detailed", None, None).await;
    assert_eq!(response.body["wsConnections"], 1);
    assert_eq!(response.body["onlineUsers"], 1);
}

#[tokio::test]
async fn test_presence_status_requires_auth() {
    let app = TestApp::new();

    let response = app
        .request(
            "POST",
            "/api/presence/status",
            Some(json!({"userIds": ["u1"]})),
            None,
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_presence_status_reports_connected_users() {
    let app = TestApp::new();
    let token = helpers::make_token("observer");

    let (handle, _rx) = app.engine.register("u1".to_string(), None).await;

    let response = app
        .request(
            "POST",
            "/api/presence/status",
            Some(json!({"userIds": ["u1", "u2"]})),
            Some(&token),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["statuses"]["u1"], true);
    assert_eq!(response.body["statuses"]["u2"], false);

    app.engine.deregister(&handle.id).await;

    let response = app
        .request(
            "POST",
            "/api/presence/status",
            Some(json!({"userIds": ["u1"]})),
            Some(&token),
        )
        .await;
    assert_eq!(response.body["statuses"]["u1"], false);
}
