mod app;
mod cli;
mod config;
mod error;
mod hub;
mod routes;
#[cfg(test)]
mod test_utils;
mod upstream;
mod ws;

use crate::app::{build_router, serve, AppState};
use crate::cli::Args;
use crate::config::{load_relay_config, resolve_settings};
use crate::hub::AlertHub;
use crate::upstream::HttpUpstream;
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Must run before clap reads env-backed flags.
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();
    init_tracing(args.log_json, args.log_to_stderr)?;
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    let file_config = match args.config.as_ref() {
        Some(path) => Some(
            load_relay_config(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
        ),
        None => None,
    };
    let settings = resolve_settings(&args, file_config).context("invalid relay settings")?;

    let upstream = HttpUpstream::new(&settings.ai_service_url, settings.ai_service_timeout)
        .context("failed to build AI service client")?;
    info!(
        listen_addr = %settings.listen_addr(),
        ai_service = %upstream.endpoint(),
        ai_service_timeout = %humantime::format_duration(settings.ai_service_timeout),
        webhook_auth = settings.webhook_secret.is_some(),
        alert_buffer = settings.alert_buffer,
        "relay starting"
    );

    let shutdown = CancellationToken::new();
    let state = AppState {
        hub: AlertHub::new(settings.alert_buffer),
        upstream: Arc::new(upstream),
        webhook_secret: settings.webhook_secret.as_deref().map(Arc::from),
        shutdown: shutdown.clone(),
    };
    let app = build_router(state);

    let listen_addr = settings.listen_addr();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!(addr = %listen_addr, "relay listening");

    tokio::spawn(wait_for_shutdown(shutdown.clone()));
    serve(listener, app, shutdown).await?;
    info!("relay shutting down");
    Ok(())
}

fn init_tracing(log_json: bool, log_to_stderr: bool) -> anyhow::Result<()> {
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (log_json, log_to_stderr) {
        (true, true) => builder.json().with_writer(std::io::stderr).init(),
        (true, false) => builder.json().init(),
        (false, true) => builder.with_writer(std::io::stderr).init(),
        (false, false) => builder.init(),
    }
    Ok(())
}

async fn wait_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            shutdown.cancel();
        }
    }
}
