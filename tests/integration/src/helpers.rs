//! Mock servers for integration tests
//!
//! [`MockApi`] serves a handful of REST endpoints that emit rate-limit headers
//! and error responses. [`MockGateway`] accepts WebSocket connections and plays
//! the gateway side of the session protocol.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use banter_gateway::{GatewayMessage, OpCode};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::fixtures::{
    MessageResponse, MESSAGE_LIMIT, MESSAGE_WINDOW, TEST_SESSION_ID, TEST_TOKEN,
};

/// Counter for unique test ports
static PORT_COUNTER: AtomicU16 = AtomicU16::new(19000);

/// Get a unique port for testing
pub fn get_test_port() -> u16 {
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Bind a test port and serve the router on it
async fn serve(router: Router) -> Result<(SocketAddr, JoinHandle<()>)> {
    let addr = SocketAddr::from(([127, 0, 0, 1], get_test_port()));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok((actual_addr, handle))
}

/// Poll `condition` until it holds or `timeout` passes
pub async fn eventually<F>(timeout: Duration, condition: F) -> bool
where
    F: Fn() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

// ============================================================================
// REST
// ============================================================================

/// A request as seen by the mock API
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub audit_reason: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    used: u32,
    reset_at: Instant,
}

#[derive(Default)]
struct ApiInner {
    requests: Mutex<Vec<RecordedRequest>>,
    windows: Mutex<HashMap<String, Window>>,
    /// 429s served because a client overran a window
    overruns: AtomicUsize,
    /// 502s to serve on `/flaky` before succeeding
    flaky_failures: usize,
}

impl ApiInner {
    fn record(&self, method: &Method, path: String, headers: &HeaderMap, body: &Bytes) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };

        self.requests.lock().push(RecordedRequest {
            method: method.to_string(),
            path,
            authorization: header("authorization"),
            audit_reason: header("x-audit-log-reason"),
            body: serde_json::from_slice(body).ok(),
        });
    }

    fn hits(&self, path: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }

    /// Take a slot in a window; `Err` carries the time until it resets
    fn take_slot(&self, key: String) -> std::result::Result<(u32, Duration), Duration> {
        let now = Instant::now();
        let mut windows = self.windows.lock();
        let window = windows.entry(key).or_insert(Window {
            used: 0,
            reset_at: now + MESSAGE_WINDOW,
        });

        if now >= window.reset_at {
            window.used = 0;
            window.reset_at = now + MESSAGE_WINDOW;
        }

        let reset_after = window.reset_at - now;
        if window.used >= MESSAGE_LIMIT {
            return Err(reset_after);
        }

        window.used += 1;
        Ok((MESSAGE_LIMIT - window.used, reset_after))
    }
}

type ApiState = Arc<ApiInner>;

/// Seconds with millisecond precision, rounded up
fn seconds(duration: Duration) -> String {
    format!("{:.3}", (duration.as_millis() + 1) as f64 / 1000.0)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bot {TEST_TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "401: Unauthorized", "code": 0})),
    )
        .into_response()
}

async fn messages(
    State(state): State<ApiState>,
    method: Method,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.record(&method, format!("/channels/{channel_id}/messages"), &headers, &body);
    if !authorized(&headers) {
        return unauthorized();
    }

    let bucket = format!("{method}-messages");
    let (remaining, reset_after) = match state.take_slot(format!("{method} {channel_id}")) {
        Ok(slot) => slot,
        Err(reset_after) => {
            state.overruns.fetch_add(1, Ordering::SeqCst);
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [
                    ("x-ratelimit-limit", MESSAGE_LIMIT.to_string()),
                    ("x-ratelimit-remaining", "0".to_string()),
                    ("x-ratelimit-reset-after", seconds(reset_after)),
                    ("x-ratelimit-bucket", bucket),
                ],
                Json(json!({
                    "message": "You are being rate limited.",
                    "retry_after": reset_after.as_secs_f64(),
                    "global": false
                })),
            )
                .into_response();
        }
    };

    let headers = [
        ("x-ratelimit-limit", MESSAGE_LIMIT.to_string()),
        ("x-ratelimit-remaining", remaining.to_string()),
        ("x-ratelimit-reset-after", seconds(reset_after)),
        ("x-ratelimit-bucket", bucket),
    ];

    if method == Method::POST {
        let content = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| v.get("content").and_then(Value::as_str).map(String::from))
            .unwrap_or_default();
        let message = MessageResponse {
            id: (state.hits(&format!("/channels/{channel_id}/messages")) as u64).to_string(),
            channel_id,
            content,
        };
        return (StatusCode::OK, headers, Json(message)).into_response();
    }

    (StatusCode::OK, headers, Json(Vec::<MessageResponse>::new())).into_response()
}

async fn delete_message(
    State(state): State<ApiState>,
    method: Method,
    Path((channel_id, message_id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.record(
        &method,
        format!("/channels/{channel_id}/messages/{message_id}"),
        &headers,
        &Bytes::new(),
    );
    StatusCode::NO_CONTENT.into_response()
}

async fn limited(State(state): State<ApiState>, method: Method, headers: HeaderMap) -> Response {
    state.record(&method, "/limited".to_string(), &headers, &Bytes::new());
    if state.hits("/limited") > 1 {
        return Json(json!({"ok": true})).into_response();
    }

    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            ("x-ratelimit-limit", "1".to_string()),
            ("x-ratelimit-remaining", "0".to_string()),
            ("x-ratelimit-reset-after", "0.200".to_string()),
            ("x-ratelimit-scope", "user".to_string()),
        ],
        Json(json!({
            "message": "You are being rate limited.",
            "retry_after": 0.2,
            "global": false
        })),
    )
        .into_response()
}

async fn global(State(state): State<ApiState>, method: Method, headers: HeaderMap) -> Response {
    state.record(&method, "/global".to_string(), &headers, &Bytes::new());
    if state.hits("/global") > 1 {
        return Json(json!({"ok": true})).into_response();
    }

    (
        StatusCode::TOO_MANY_REQUESTS,
        [
            ("x-ratelimit-global", "true".to_string()),
            ("x-ratelimit-scope", "global".to_string()),
            ("retry-after", "1".to_string()),
        ],
        Json(json!({
            "message": "You are being rate limited.",
            "retry_after": 0.3,
            "global": true
        })),
    )
        .into_response()
}

async fn flaky(State(state): State<ApiState>, method: Method, headers: HeaderMap) -> Response {
    state.record(&method, "/flaky".to_string(), &headers, &Bytes::new());
    if state.hits("/flaky") > state.flaky_failures {
        return Json(json!({"ok": true})).into_response();
    }
    (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response()
}

/// One request per 50ms; the second request is answered by a proxy 502 with no headers
async fn proxied(State(state): State<ApiState>, method: Method, headers: HeaderMap) -> Response {
    state.record(&method, "/proxied".to_string(), &headers, &Bytes::new());
    if state.hits("/proxied") == 2 {
        return (StatusCode::BAD_GATEWAY, "upstream unavailable").into_response();
    }

    (
        StatusCode::OK,
        [
            ("x-ratelimit-limit", "1".to_string()),
            ("x-ratelimit-remaining", "0".to_string()),
            ("x-ratelimit-reset-after", "0.050".to_string()),
        ],
        Json(json!({"ok": true})),
    )
        .into_response()
}

async fn protected(State(state): State<ApiState>, method: Method, headers: HeaderMap) -> Response {
    state.record(&method, "/users/@me".to_string(), &headers, &Bytes::new());
    unauthorized()
}

async fn unknown_channel(
    State(state): State<ApiState>,
    method: Method,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(&method, format!("/channels/{channel_id}"), &headers, &Bytes::new());
    (
        StatusCode::NOT_FOUND,
        Json(json!({"message": "Unknown Channel", "code": 10003})),
    )
        .into_response()
}

/// Mock REST API
pub struct MockApi {
    pub addr: SocketAddr,
    state: ApiState,
    _handle: JoinHandle<()>,
}

impl MockApi {
    /// Start a mock API whose `/flaky` endpoint fails twice before succeeding
    pub async fn start() -> Result<Self> {
        Self::start_with_flaky_failures(2).await
    }

    pub async fn start_with_flaky_failures(flaky_failures: usize) -> Result<Self> {
        let state = Arc::new(ApiInner {
            flaky_failures,
            ..ApiInner::default()
        });

        let router = Router::new()
            .route(
                "/api/channels/:channel_id/messages",
                get(messages).post(messages),
            )
            .route(
                "/api/channels/:channel_id/messages/:message_id",
                axum::routing::delete(delete_message),
            )
            .route("/api/channels/:channel_id", get(unknown_channel))
            .route("/api/limited", get(limited))
            .route("/api/global", get(global))
            .route("/api/flaky", get(flaky))
            .route("/api/proxied", get(proxied))
            .route("/api/users/@me", get(protected))
            .with_state(Arc::clone(&state));

        let (addr, handle) = serve(router).await?;
        tracing::debug!(%addr, "Mock API listening");

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Base URL including the `/api` prefix
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    /// Requests received for a path, relative to the API base
    pub fn hits(&self, path: &str) -> usize {
        self.state.hits(path)
    }

    /// 429s served because a window was overrun
    pub fn overruns(&self) -> usize {
        self.state.overruns.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Gateway
// ============================================================================

struct GatewayInner {
    url: String,
    heartbeat_interval: u64,
    sequence: AtomicU64,
    connections: AtomicUsize,
    received: Mutex<Vec<GatewayMessage>>,
    kicks: broadcast::Sender<u16>,
}

impl GatewayInner {
    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

type GatewayState = Arc<GatewayInner>;

async fn gateway_upgrade(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| gateway_session(state, socket))
}

async fn send(socket: &mut WebSocket, frame: &GatewayMessage) -> bool {
    match frame.to_json() {
        Ok(json) => socket.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => false,
    }
}

/// Serve one client connection
async fn gateway_session(state: GatewayState, mut socket: WebSocket) {
    state.connections.fetch_add(1, Ordering::SeqCst);
    let mut kicks = state.kicks.subscribe();

    if !send(&mut socket, &GatewayMessage::hello(state.heartbeat_interval)).await {
        return;
    }

    loop {
        tokio::select! {
            kick = kicks.recv() => {
                if let Ok(code) = kick {
                    let frame = CloseFrame { code, reason: "kicked".into() };
                    let _ = socket.send(Message::Close(Some(frame))).await;
                }
                return;
            }
            incoming = socket.recv() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_)) | Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                };
                let Ok(frame) = GatewayMessage::from_json(&text) else {
                    continue;
                };
                state.received.lock().push(frame.clone());

                let replies = match frame.op {
                    OpCode::Identify => vec![
                        GatewayMessage::dispatch(
                            "READY",
                            state.next_sequence(),
                            json!({
                                "v": 10,
                                "session_id": TEST_SESSION_ID,
                                "resume_gateway_url": state.url,
                            }),
                        ),
                        GatewayMessage::dispatch(
                            "MESSAGE_CREATE",
                            state.next_sequence(),
                            json!({"id": "1", "channel_id": "7", "content": "welcome"}),
                        ),
                    ],
                    OpCode::Resume => vec![GatewayMessage::dispatch(
                        "RESUMED",
                        state.next_sequence(),
                        json!({}),
                    )],
                    OpCode::Heartbeat => vec![GatewayMessage::heartbeat_ack()],
                    _ => Vec::new(),
                };

                for reply in &replies {
                    if !send(&mut socket, reply).await {
                        return;
                    }
                }
            }
        }
    }
}

/// Mock WebSocket gateway
pub struct MockGateway {
    pub addr: SocketAddr,
    state: GatewayState,
    _handle: JoinHandle<()>,
}

impl MockGateway {
    pub async fn start(heartbeat_interval: u64) -> Result<Self> {
        let addr = SocketAddr::from(([127, 0, 0, 1], get_test_port()));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let (kicks, _) = broadcast::channel(8);
        let state = Arc::new(GatewayInner {
            url: format!("ws://{addr}/gateway"),
            heartbeat_interval,
            sequence: AtomicU64::new(0),
            connections: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
            kicks,
        });

        let router = Router::new()
            .route("/gateway", get(gateway_upgrade))
            .with_state(Arc::clone(&state));
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.ok();
        });

        tracing::debug!(%addr, "Mock gateway listening");

        Ok(Self {
            addr,
            state,
            _handle: handle,
        })
    }

    /// Connection URL with the usual query parameters
    pub fn url(&self) -> String {
        format!("{}?v=10&encoding=json", self.state.url)
    }

    /// Close every open connection with `code`; returns how many were closed
    pub fn kick(&self, code: u16) -> usize {
        self.state.kicks.send(code).unwrap_or(0)
    }

    pub fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Op codes of every frame received from clients, in order
    pub fn received_ops(&self) -> Vec<OpCode> {
        self.state.received.lock().iter().map(|f| f.op).collect()
    }

    pub fn received(&self) -> Vec<GatewayMessage> {
        self.state.received.lock().clone()
    }
}
