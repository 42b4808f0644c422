use anyhow::Context;
use relay_protocol::{DEFAULT_AI_SERVICE_URL, DEFAULT_HOST, DEFAULT_PORT};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cli::Args;

const DEFAULT_AI_SERVICE_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_ALERT_BUFFER: usize = 512;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RelayFileConfig {
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) ai_service_url: Option<String>,
    /// Humantime duration, e.g. `"30s"` or `"1500ms"`.
    pub(crate) ai_service_timeout: Option<String>,
    pub(crate) webhook_secret: Option<String>,
    pub(crate) alert_buffer: Option<usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct RelaySettings {
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) ai_service_url: String,
    pub(crate) ai_service_timeout: Duration,
    pub(crate) webhook_secret: Option<String>,
    pub(crate) alert_buffer: usize,
}

impl RelaySettings {
    pub(crate) fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn load_relay_config(path: &Path) -> anyhow::Result<RelayFileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: RelayFileConfig = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(config)
}

pub(crate) fn resolve_settings(
    args: &Args,
    file: Option<RelayFileConfig>,
) -> anyhow::Result<RelaySettings> {
    let file = file.unwrap_or_default();

    let host = args
        .host
        .clone()
        .or(file.host)
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    if host.trim().is_empty() {
        anyhow::bail!("host cannot be empty");
    }
    let port = args.port.or(file.port).unwrap_or(DEFAULT_PORT);

    let ai_service_url = args
        .ai_service_url
        .clone()
        .or(file.ai_service_url)
        .unwrap_or_else(|| DEFAULT_AI_SERVICE_URL.to_string());
    validate_service_url(&ai_service_url)?;

    let ai_service_timeout = match (args.ai_service_timeout, file.ai_service_timeout) {
        (Some(timeout), _) => timeout,
        (None, Some(raw)) => humantime::parse_duration(raw.trim())
            .with_context(|| format!("invalid ai_service_timeout {raw:?}"))?,
        (None, None) => DEFAULT_AI_SERVICE_TIMEOUT,
    };
    if ai_service_timeout.is_zero() {
        anyhow::bail!("ai_service_timeout must be greater than zero");
    }

    let webhook_secret = args.webhook_secret.clone().or(file.webhook_secret);
    if let Some(secret) = webhook_secret.as_deref() {
        if secret.trim().is_empty() {
            anyhow::bail!("webhook_secret cannot be blank; unset it to disable the check");
        }
    } else {
        tracing::warn!("webhook_secret is not set; /api/webhook/alert accepts any caller");
    }

    let alert_buffer = args
        .alert_buffer
        .or(file.alert_buffer)
        .unwrap_or(DEFAULT_ALERT_BUFFER);
    if alert_buffer == 0 {
        anyhow::bail!("alert_buffer must be greater than zero");
    }

    Ok(RelaySettings {
        host,
        port,
        ai_service_url,
        ai_service_timeout,
        webhook_secret,
        alert_buffer,
    })
}

fn validate_service_url(raw: &str) -> anyhow::Result<()> {
    if raw.trim().is_empty() {
        anyhow::bail!("ai_service_url cannot be empty");
    }
    let url = reqwest::Url::parse(raw).with_context(|| format!("invalid ai_service_url {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => anyhow::bail!("ai_service_url {raw} must use http or https, got {other}"),
    }
}
