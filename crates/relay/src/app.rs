use axum::body::Body;
use axum::http::{Method, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::hub::AlertHub;
use crate::routes::{analyze, health, liveness, webhook_alert};
use crate::upstream::AnalysisUpstream;
use crate::ws::ws_handler;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) hub: AlertHub,
    pub(crate) upstream: Arc<dyn AnalysisUpstream>,
    pub(crate) webhook_secret: Option<Arc<str>>,
    pub(crate) shutdown: CancellationToken,
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/webhook/alert", post(webhook_alert))
        .route("/ws", get(ws_handler))
        .with_state(state)
        .layer(cors_layer())
        .layer(middleware::from_fn(log_http_request))
}

/// Serves until `shutdown` is cancelled. Open WebSocket sessions observe the
/// same token and close themselves.
pub(crate) async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await?;
    Ok(())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
        ])
        .allow_headers(Any)
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let host = req
        .headers()
        .get("host")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    let status = response.status();
    tracing::info!(
        method = %method,
        uri = %uri,
        host = %host,
        status = %status,
        latency_ms = started.elapsed().as_millis() as u64,
        "http request"
    );
    response
}
