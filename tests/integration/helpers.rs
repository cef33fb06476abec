//! Shared test helpers for integration tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use chrono::Utc;
use http::{Request, StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::Value;
use tower::ServiceExt;

use lumen_auth::claims::Claims;
use lumen_auth::resolver::PassthroughResolver;
use lumen_auth::verifier::TokenVerifier;
use lumen_core::config::AppConfig;
use lumen_gateway::connection::authenticator::ConnectionAuthenticator;
use lumen_gateway::engine::GatewayEngine;
use lumen_gateway::push::NoopPushSender;
use lumen_gateway::router::build_router;
use lumen_gateway::state::AppState;
use lumen_presence::memory::MemoryPresenceStore;
use lumen_presence::{PresenceManager, PresenceTracker};

pub const JWT_SECRET: &str = "integration-test-secret";

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// The gateway engine, for driving connections directly
    pub engine: Arc<GatewayEngine>,
    /// The presence tracker shared with the engine
    pub presence: Arc<PresenceTracker>,
}

impl TestApp {
    /// Create a new test application with an in-memory presence store.
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = Some(JWT_SECRET.to_string());

        let manager = Arc::new(PresenceManager::from_store(Arc::new(
            MemoryPresenceStore::new(&config.presence.memory),
        )));
        let presence = Arc::new(PresenceTracker::new(manager, &config.presence));

        let engine = Arc::new(GatewayEngine::new(
            config.gateway.clone(),
            Arc::clone(&presence),
            Arc::new(NoopPushSender),
        ));

        let authenticator = ConnectionAuthenticator::new(
            Arc::new(TokenVerifier::new(&config.auth)),
            Arc::new(PassthroughResolver),
        );

        let state = AppState {
            config: Arc::new(config),
            engine: Arc::clone(&engine),
            authenticator,
            presence: Arc::clone(&presence),
        };

        Self {
            router: build_router(state),
            engine,
            presence,
        }
    }

    /// Send a request to the test router.
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }
}

impl TestApp {
    /// Send a WebSocket upgrade request with the handshake headers set,
    /// so the handler's auth check is reached.
    ///
    /// Goes through a real listener rather than `oneshot`: requests built
    /// by hand lack hyper's `OnUpgrade` extension, so the `WebSocketUpgrade`
    /// extractor would reject with 426 before the handler runs.
    pub async fn ws_request(&self, path: &str) -> TestResponse {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to get local addr");
        let router = self.router.clone();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        let mut stream = tokio::net::TcpStream::connect(addr)
            .await
            .expect("Failed to connect");
        let request = format!(
            "GET {path} HTTP/1.1\r\n\
             Host: 127.0.0.1\r\n\
             Connection: Upgrade\r\n\
             Upgrade: websocket\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
        );
        stream
            .write_all(request.as_bytes())
            .await
            .expect("Failed to send request");

        // Read until the headers are complete, then drain the body per
        // Content-Length (the connection stays open on non-upgrade responses).
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.expect("Failed to read");
            if n == 0 {
                panic!("Connection closed before response headers");
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
        let status_code: u16 = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .expect("Failed to parse status line");
        let status = StatusCode::from_u16(status_code).expect("Invalid status code");

        let content_length: usize = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse().ok())?
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = stream.read(&mut chunk).await.expect("Failed to read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let body: Value =
            serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null);

        server.abort();

        TestResponse { status, body }
    }
}

/// Response captured from the test router.
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Mint a token the test app accepts.
pub fn make_token(sub: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        email: None,
        iat: now,
        exp: now + 300,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("Failed to encode token")
}
