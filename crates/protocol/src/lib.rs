use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod alert;

pub use alert::{alert_level, is_red_alert, AlertLevel};

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_AI_SERVICE_URL: &str = "http://backend-ai:8000";
pub const ANALYZE_PATH: &str = "/analyze";
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Name of the single broadcast event pushed to WebSocket clients.
pub const ALERT_EVENT: &str = "alert";

/// Frame pushed from the relay to a WebSocket client.
///
/// Serialized adjacently tagged, e.g. `{"event":"alert","payload":{...}}`.
/// `alert` is the only event the relay emits.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum RelayEvent {
    Alert(Value),
}
