use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use bytes::Bytes;
use futures_util::StreamExt;
use relay_protocol::{RelayEvent, ANALYZE_PATH};
use serde_json::Value;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::app::{build_router, serve, AppState};
use crate::hub::AlertHub;
use crate::upstream::HttpUpstream;

pub(crate) const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) fn temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{prefix}-{nanos}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

#[derive(Clone)]
enum StubBody {
    Json(Value),
    Text(&'static str),
    Empty,
}

/// Canned answer served by the stub analysis service.
#[derive(Clone)]
pub(crate) struct StubReply {
    status: StatusCode,
    body: StubBody,
    delay: Option<Duration>,
}

impl StubReply {
    pub(crate) fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: StubBody::Json(body),
            delay: None,
        }
    }

    pub(crate) fn text(body: &'static str) -> Self {
        Self {
            status: StatusCode::OK,
            body: StubBody::Text(body),
            delay: None,
        }
    }

    pub(crate) fn status(code: u16) -> Self {
        Self {
            status: StatusCode::from_u16(code).expect("status code"),
            body: StubBody::Empty,
            delay: None,
        }
    }

    pub(crate) fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Clone)]
struct StubState {
    reply: StubReply,
    received: Arc<Mutex<Vec<Bytes>>>,
}

pub(crate) struct StubUpstream {
    pub(crate) base_url: String,
    received: Arc<Mutex<Vec<Bytes>>>,
}

impl StubUpstream {
    /// Raw request bodies seen on `/analyze`, in arrival order.
    pub(crate) async fn received(&self) -> Vec<Bytes> {
        self.received.lock().await.clone()
    }
}

async fn stub_analyze(State(state): State<StubState>, body: Bytes) -> Response {
    state.received.lock().await.push(body);
    if let Some(delay) = state.reply.delay {
        tokio::time::sleep(delay).await;
    }
    match state.reply.body {
        StubBody::Json(value) => (state.reply.status, axum::Json(value)).into_response(),
        StubBody::Text(text) => (state.reply.status, text).into_response(),
        StubBody::Empty => state.reply.status.into_response(),
    }
}

pub(crate) async fn spawn_stub_upstream(reply: StubReply) -> StubUpstream {
    let received = Arc::new(Mutex::new(Vec::new()));
    let router = Router::new()
        .route(ANALYZE_PATH, post(stub_analyze))
        .with_state(StubState {
            reply,
            received: Arc::clone(&received),
        });
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    StubUpstream {
        base_url: format!("http://{addr}"),
        received,
    }
}

/// Base URL of a loopback port with nothing listening on it.
pub(crate) async fn unused_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}

pub(crate) struct TestRelay {
    pub(crate) addr: SocketAddr,
    pub(crate) hub: AlertHub,
    pub(crate) shutdown: CancellationToken,
}

impl TestRelay {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub(crate) async fn spawn_relay(ai_service_url: &str, webhook_secret: Option<&str>) -> TestRelay {
    spawn_relay_with_timeout(ai_service_url, webhook_secret, Duration::from_secs(2)).await
}

pub(crate) async fn spawn_relay_with_timeout(
    ai_service_url: &str,
    webhook_secret: Option<&str>,
    ai_service_timeout: Duration,
) -> TestRelay {
    let upstream =
        HttpUpstream::new(ai_service_url, ai_service_timeout).expect("http upstream");
    let hub = AlertHub::new(64);
    let shutdown = CancellationToken::new();
    let state = AppState {
        hub: hub.clone(),
        upstream: Arc::new(upstream),
        webhook_secret: webhook_secret.map(Arc::from),
        shutdown: shutdown.clone(),
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay addr");
    let router = build_router(state);
    let serve_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = serve(listener, router, serve_shutdown).await;
    });
    TestRelay {
        addr,
        hub,
        shutdown,
    }
}

/// Opens a WebSocket and waits until the hub has registered it. Clients must
/// be opened one at a time.
pub(crate) async fn ws_connect(relay: &TestRelay) -> WsClient {
    let before = relay.hub.connection_count().await;
    let (ws, _) = connect_async(format!("ws://{}/ws", relay.addr))
        .await
        .expect("ws connect");
    wait_for_connections(relay, before + 1).await;
    ws
}

pub(crate) async fn wait_for_connections(relay: &TestRelay, expected: usize) {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while relay.hub.connection_count().await != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count settles");
}

/// Next relay event, or `None` once the server closes the socket.
pub(crate) async fn next_event(ws: &mut WsClient) -> Option<RelayEvent> {
    tokio::time::timeout(WAIT_TIMEOUT, async {
        while let Some(message) = ws.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(&text).expect("relay event json"));
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
        None
    })
    .await
    .expect("websocket event within timeout")
}

pub(crate) async fn next_alert(ws: &mut WsClient) -> Value {
    match next_event(ws).await {
        Some(RelayEvent::Alert(payload)) => payload,
        other => panic!("expected alert event, got {other:?}"),
    }
}

/// Pushes a marker through the webhook and checks it is the next alert the
/// client sees, proving nothing else was queued ahead of it.
pub(crate) async fn assert_no_alert_before(relay: &TestRelay, ws: &mut WsClient) {
    let marker = serde_json::json!({ "marker": uuid::Uuid::new_v4().to_string() });
    let response = reqwest::Client::new()
        .post(relay.url("/api/webhook/alert"))
        .json(&marker)
        .send()
        .await
        .expect("marker webhook");
    assert_eq!(response.status(), 200);
    assert_eq!(next_alert(ws).await, marker);
}
