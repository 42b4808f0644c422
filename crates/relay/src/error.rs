use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::upstream::UpstreamError;

/// Failures surfaced to HTTP callers. Bodies stay generic; details go to logs.
#[derive(Debug, Error)]
pub(crate) enum RelayError {
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("webhook secret missing or invalid")]
    Unauthorized,

    #[error("analysis upstream failed: {0}")]
    Upstream(#[from] UpstreamError),
}

impl RelayError {
    fn status(&self) -> StatusCode {
        match self {
            RelayError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            RelayError::Unauthorized => StatusCode::UNAUTHORIZED,
            RelayError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            RelayError::InvalidBody(_) => "Invalid JSON body",
            RelayError::Unauthorized => "Unauthorized",
            RelayError::Upstream(_) => "Failed to analyze data",
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.public_message() }));
        (self.status(), body).into_response()
    }
}
