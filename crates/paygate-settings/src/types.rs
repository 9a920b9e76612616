//! Settings types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings object.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaygateSettings {
    /// Listener.
    pub server: ServerSettings,
    /// Callback delivery.
    pub relay: RelaySettings,
    /// Outbound HTTP client.
    pub upstream: UpstreamSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl PaygateSettings {
    /// Reject values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.relay.loopback_url {
            if !(url.starts_with("ws://") || url.starts_with("wss://")) {
                return Err(SettingsError::InvalidValue(format!(
                    "relay.loopbackUrl must be a ws:// or wss:// URL, got {url:?}"
                )));
            }
        }
        if self.server.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "server.sendQueueCapacity must be at least 1".into(),
            ));
        }
        if !is_level(&self.logging.level) {
            return Err(SettingsError::InvalidValue(format!(
                "logging.level {:?} is not one of trace, debug, info, warn, error",
                self.logging.level
            )));
        }
        for (module, level) in &self.logging.modules {
            if !is_level(level) {
                return Err(SettingsError::InvalidValue(format!(
                    "logging.modules.{module} has unknown level {level:?}"
                )));
            }
        }
        Ok(())
    }
}

fn is_level(level: &str) -> bool {
    matches!(
        level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}

/// HTTP/WebSocket listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` picks a free port).
    pub port: u16,
    /// Outbound queue depth per WebSocket connection.
    pub send_queue_capacity: usize,
    /// Largest accepted inbound WebSocket frame, in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            send_queue_capacity: 64,
            max_message_size: 64 * 1024,
        }
    }
}

/// How `POST /callback` reaches the waiting connections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayMode {
    /// Call the registry fan-out directly.
    #[default]
    InProcess,
    /// Dial our own `/ws/payment` endpoint and send the notification over it.
    Loopback,
}

/// Callback relay settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// In-process fan-out or loopback dial.
    pub mode: RelayMode,
    /// Endpoint dialed in loopback mode. Defaults to the listener's own
    /// `/ws/payment` address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loopback_url: Option<String>,
}

/// Outbound HTTP client settings. Unset means no timeout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpstreamSettings {
    /// TCP/TLS connect timeout.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,
    /// Whole-request timeout, per hop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

/// Log output settings. `RUST_LOG` takes precedence when set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default level.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
    /// Per-module level overrides (e.g. `"paygate_server" => "debug"`).
    pub modules: BTreeMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            modules: BTreeMap::new(),
        }
    }
}
