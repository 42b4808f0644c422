use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use bytes::Bytes;
use relay_protocol::{is_red_alert, RelayEvent, WEBHOOK_SECRET_HEADER};
use serde_json::Value;

use crate::app::AppState;
use crate::error::RelayError;

pub(crate) const LIVENESS_MESSAGE: &str = "BrandShield User Backend Running";
pub(crate) const WEBHOOK_ACK: &str = "Alert received";

pub(crate) async fn liveness() -> &'static str {
    LIVENESS_MESSAGE
}

pub(crate) async fn health() -> &'static str {
    "ok"
}

pub(crate) async fn analyze(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, RelayError> {
    let body = json_body(body)?;
    let result = match state.upstream.analyze(body).await {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(
                event = "analyze.failed",
                error = %err,
                "error calling AI service"
            );
            return Err(err.into());
        }
    };

    if is_red_alert(&result) {
        let receivers = state.hub.broadcast(RelayEvent::Alert(result.clone()));
        tracing::warn!(
            event = "alert.broadcast",
            source = "analyze",
            receivers = receivers,
            "red alert broadcast"
        );
    }
    Ok(Json(result))
}

pub(crate) async fn webhook_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, RelayError> {
    if !webhook_authorized(state.webhook_secret.as_deref(), &headers) {
        tracing::warn!(event = "webhook.rejected", "webhook call without valid secret");
        return Err(RelayError::Unauthorized);
    }
    let body = json_body(body)?;
    let payload: Value = serde_json::from_slice(&body).map_err(RelayError::InvalidBody)?;
    let receivers = state.hub.broadcast(RelayEvent::Alert(payload));
    tracing::info!(
        event = "alert.broadcast",
        source = "webhook",
        receivers = receivers,
        "webhook alert broadcast"
    );
    Ok(WEBHOOK_ACK)
}

/// Validates that `body` is JSON and returns it unchanged. An empty body is
/// treated as `{}`.
fn json_body(body: Bytes) -> Result<Bytes, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Bytes::from_static(b"{}"));
    }
    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(RelayError::InvalidBody)?;
    Ok(body)
}

fn webhook_authorized(secret: Option<&str>, headers: &HeaderMap) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    headers
        .get(WEBHOOK_SECRET_HEADER)
        .map(|value| constant_time_eq(value.as_bytes(), secret.as_bytes()))
        .unwrap_or(false)
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }
    left.iter()
        .zip(right)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
