use serde_json::Value;

/// Alert level reported under `forecast.alert_level` in an analysis result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AlertLevel {
    Red,
    Other(String),
}

impl AlertLevel {
    pub fn parse(raw: &str) -> Self {
        // Case-sensitive: "red" is not an alert.
        if raw == "RED" {
            AlertLevel::Red
        } else {
            AlertLevel::Other(raw.to_string())
        }
    }
}

/// Reads `forecast.alert_level` when it is present and a string.
pub fn alert_level(result: &Value) -> Option<AlertLevel> {
    result
        .get("forecast")
        .and_then(|forecast| forecast.get("alert_level"))
        .and_then(Value::as_str)
        .map(AlertLevel::parse)
}

pub fn is_red_alert(result: &Value) -> bool {
    matches!(alert_level(result), Some(AlertLevel::Red))
}
