use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use relay_protocol::ANALYZE_PATH;

#[derive(Debug, Error)]
pub(crate) enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("{url} returned a non-JSON body: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// The external analysis service as seen by the relay.
#[async_trait]
pub(crate) trait AnalysisUpstream: Send + Sync {
    /// Forwards a raw JSON request body and returns the parsed result.
    async fn analyze(&self, body: Bytes) -> Result<Value, UpstreamError>;
}

pub(crate) struct HttpUpstream {
    client: Client,
    endpoint: String,
}

impl HttpUpstream {
    pub(crate) fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = join_base_path(base_url, ANALYZE_PATH)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisUpstream for HttpUpstream {
    async fn analyze(&self, body: Bytes) -> Result<Value, UpstreamError> {
        let url = self.endpoint.clone();
        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status { url, status });
        }
        let body = response
            .bytes()
            .await
            .map_err(|source| UpstreamError::Transport {
                url: url.clone(),
                source,
            })?;
        serde_json::from_slice(&body).map_err(|source| UpstreamError::Decode { url, source })
    }
}

fn join_base_path(base: &str, path: &str) -> anyhow::Result<String> {
    if base.trim().is_empty() {
        anyhow::bail!("ai_service_url is empty");
    }
    let normalized_base = base.trim().trim_end_matches('/');
    let normalized_path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    Ok(format!("{normalized_base}{normalized_path}"))
}
