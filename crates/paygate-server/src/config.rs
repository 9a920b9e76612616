//! Server configuration.

use paygate_settings::{PaygateSettings, RelayMode};

/// Configuration for [`PaygateServer`](crate::server::PaygateServer).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Outbound queue depth per `WebSocket` connection.
    pub send_queue_capacity: usize,
    /// Max inbound `WebSocket` message size in bytes.
    pub max_message_size: usize,
    /// How `POST /callback` reaches the registry.
    pub relay_mode: RelayMode,
    /// Loopback target. `None` dials the listener's own `/ws/payment`.
    pub loopback_url: Option<String>,
}

impl ServerConfig {
    /// Project the `server` and `relay` sections of the loaded settings.
    pub fn from_settings(settings: &PaygateSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            send_queue_capacity: settings.server.send_queue_capacity,
            max_message_size: settings.server.max_message_size,
            relay_mode: settings.relay.mode,
            loopback_url: settings.relay.loopback_url.clone(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            send_queue_capacity: 64,
            max_message_size: 64 * 1024,
            relay_mode: RelayMode::InProcess,
            loopback_url: None,
        }
    }
}
