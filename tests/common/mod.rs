//! tests/common/mod.rs
//! Shared helpers: spawn the relay on an ephemeral port next to a mock upstream.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    serve, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener as TokioTcpListener;

use plaid_relay::config::{environment::EnvironmentVariables, state::AppState};
use plaid_relay::core::server::create_app;

pub const SITE: &str = "https://relay.test";
pub const ACCESS_TOKEN: &str = "access-sandbox-test-token";
pub const CLIENT_ID: &str = "test-client-id";
pub const SECRET: &str = "test-secret";

/// One request the mock upstream received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Debug, Clone)]
enum MockReply {
    Json(Value),
    Raw(&'static str),
}

/// Upstream stand-in: answers every path with a configured reply and records what it saw.
#[derive(Debug, Clone, Default)]
pub struct MockUpstream {
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    received: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    /// Starts the mock and returns it with its base URL.
    pub async fn start() -> (Self, String) {
        let mock: MockUpstream = MockUpstream::default();
        let app: Router = Router::new().fallback(record).with_state(mock.clone());
        let base_url: String = serve_on_ephemeral_port(app).await;
        (mock, base_url)
    }

    /// Replies to `path` (e.g. "link/token/create") with this JSON.
    pub fn reply(&self, path: &str, body: Value) {
        self.replies.lock().unwrap().insert(path.to_string(), MockReply::Json(body));
    }

    /// Replies to `path` with a raw, possibly non-JSON, body.
    pub fn reply_raw(&self, path: &str, body: &'static str) {
        self.replies.lock().unwrap().insert(path.to_string(), MockReply::Raw(body));
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.received.lock().unwrap().clone()
    }
}

async fn record(State(mock): State<MockUpstream>, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
    let path: String = uri.path().trim_start_matches('/').to_string();
    let parsed: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    mock.received.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        headers,
        body: parsed,
    });

    let reply: MockReply = mock
        .replies
        .lock()
        .unwrap()
        .get(&path)
        .cloned()
        .unwrap_or_else(|| MockReply::Json(json!({ "request_id": "mock-request" })));

    match reply {
        MockReply::Json(value) => (StatusCode::OK, axum::Json(value)).into_response(),
        MockReply::Raw(text) => (StatusCode::OK, text).into_response(),
    }
}

async fn serve_on_ephemeral_port(app: Router) -> String {
    // * Bind an ephemeral port using std::net::TcpListener.
    let std_listener: std::net::TcpListener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    std_listener.set_nonblocking(true).unwrap();

    // * Convert std::net::TcpListener to tokio::net::TcpListener.
    let tokio_listener: TokioTcpListener = TokioTcpListener::from_std(std_listener)
        .expect("Failed to convert to tokio listener");

    let addr: std::net::SocketAddr = tokio_listener.local_addr().unwrap();

    // * Spawn the server in a background task.
    tokio::spawn(async move {
        serve(tokio_listener, app)
            .await
            .expect("Server failed");
    });

    format!("http://{}", addr)
}

/// Configuration pointing at `upstream`, with every credential set.
pub fn test_env(upstream: &str) -> EnvironmentVariables {
    test_env_with(upstream, &[])
}

/// Like `test_env`, with extra variables; an empty value removes a default.
pub fn test_env_with(upstream: &str, extra: &[(&str, &str)]) -> EnvironmentVariables {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("ENVIRONMENT".to_string(), "test".to_string()),
        ("PLAID_DOMAIN_SANDBOX".to_string(), upstream.to_string()),
        ("SITE_DOMAIN_NAME".to_string(), SITE.to_string()),
        ("PLAID_ACCESS_TOKEN".to_string(), ACCESS_TOKEN.to_string()),
        ("PLAID_CLIENT_ID".to_string(), CLIENT_ID.to_string()),
        ("PLAID_SECRET".to_string(), SECRET.to_string()),
        ("TASK_WORKERS".to_string(), "2".to_string()),
    ]);

    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }

    EnvironmentVariables::from_vars(&vars).expect("test configuration should parse")
}

/// Spawns the relay with the given configuration and returns its base URL.
pub async fn spawn_app(env: EnvironmentVariables) -> String {
    let state: AppState = AppState::new(env).await.expect("Failed to build app state");
    serve_on_ephemeral_port(create_app(state)).await
}

/// Spawns a mock upstream and a relay pointing at it.
pub async fn spawn_with_upstream() -> (MockUpstream, String) {
    let (mock, upstream) = MockUpstream::start().await;
    let base_url: String = spawn_app(test_env(&upstream)).await;
    (mock, base_url)
}

/// POSTs JSON to the relay and returns status plus decoded body (Null when empty).
pub async fn post_json(base_url: &str, route: &str, body: Value) -> (reqwest::StatusCode, Value) {
    let resp: reqwest::Response = reqwest::Client::new()
        .post(format!("{}{}", base_url, route))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request.");

    let status: reqwest::StatusCode = resp.status();
    let text: String = resp.text().await.unwrap();
    let json: Value = if text.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&text).unwrap()
    };

    (status, json)
}
