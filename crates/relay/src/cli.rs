use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug, Default)]
#[command(
    name = "brandshield-relay",
    version,
    about = "BrandShield alert relay: forwards analyses and pushes alerts over WebSocket"
)]
pub(crate) struct Args {
    /// Optional TOML file; flags and env vars take precedence over it.
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,
    #[arg(long, env = "HOST")]
    pub(crate) host: Option<String>,
    #[arg(long, env = "PORT")]
    pub(crate) port: Option<u16>,
    #[arg(long, env = "AI_SERVICE_URL")]
    pub(crate) ai_service_url: Option<String>,
    #[arg(long, env = "AI_SERVICE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub(crate) ai_service_timeout: Option<Duration>,
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub(crate) webhook_secret: Option<String>,
    #[arg(long, env = "ALERT_BUFFER")]
    pub(crate) alert_buffer: Option<usize>,
    #[arg(long, default_value_t = false)]
    pub(crate) log_json: bool,
    #[arg(long, default_value_t = false)]
    pub(crate) log_to_stderr: bool,
}
