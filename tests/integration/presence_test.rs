//! Integration tests for presence transitions driven through the engine.

use serde_json::Value;

use crate::helpers::TestApp;

fn parse(frame: &str) -> Value {
    serde_json::from_str(frame).expect("frame is not valid JSON")
}

#[tokio::test]
async fn test_online_broadcast_on_first_device() {
    let app = TestApp::new();

    let (_watcher, mut watcher_rx) = app.engine.register("watcher".to_string(), None).await;
    let (_conn, _rx) = app.engine.register("u1".to_string(), None).await;

    let frame = parse(&watcher_rx.recv().await.expect("no broadcast"));
    assert_eq!(frame["event"], "presence:update");
    assert_eq!(frame["data"]["userId"], "u1");
    assert_eq!(frame["data"]["status"], "online");
}

#[tokio::test]
async fn test_offline_only_after_last_device() {
    let app = TestApp::new();

    let (a, _rx_a) = app.engine.register("u1".to_string(), None).await;
    let (b, _rx_b) = app.engine.register("u1".to_string(), None).await;
    let (_watcher, mut watcher_rx) = app.engine.register("watcher".to_string(), None).await;

    app.engine.deregister(&a.id).await;
    assert!(app.presence.is_online(&"u1".to_string()).await);

    app.engine.deregister(&b.id).await;
    assert!(!app.presence.is_online(&"u1".to_string()).await);

    let frame = parse(&watcher_rx.recv().await.expect("no broadcast"));
    assert_eq!(frame["event"], "presence:update");
    assert_eq!(frame["data"]["status"], "offline");
    assert!(watcher_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_maintenance_cycle_keeps_connected_users_online() {
    let app = TestApp::new();

    let (_conn, _rx) = app.engine.register("u1".to_string(), None).await;

    app.engine.run_maintenance_cycle().await;
    assert!(app.presence.is_online(&"u1".to_string()).await);
}

#[tokio::test]
async fn test_call_relayed_between_connections() {
    let app = TestApp::new();

    let (caller, mut caller_rx) = app.engine.register("alice".to_string(), None).await;
    let (_callee, mut callee_rx) = app.engine.register("bob".to_string(), None).await;
    let _ = caller_rx.recv().await; // presence:update for bob

    app.engine
        .handle_event(
            &caller.id,
            r#"{"event":"call:initiate","data":{"targetUserId":"bob","type":"video"}}"#,
        )
        .await;

    let frame = parse(&callee_rx.recv().await.expect("no call:incoming"));
    assert_eq!(frame["event"], "call:incoming");
    assert_eq!(frame["data"]["callerId"], "alice");
    assert_eq!(frame["data"]["type"], "video");
    let call_id = frame["data"]["callId"].as_str().expect("missing callId");

    let ack = parse(&caller_rx.recv().await.expect("no call:initiated"));
    assert_eq!(ack["event"], "call:initiated");
    assert_eq!(ack["data"]["callId"], call_id);
}
