//! Delivery path from `POST /callback` to the connection registry.

use std::sync::Arc;

use futures::SinkExt;
use paygate_core::CallbackNotification;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, instrument};

use crate::websocket::fanout::{self, FanOutReport};
use crate::websocket::registry::ConnectionRegistry;

/// Errors from relaying a callback. Only the loopback path can fail.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The notification could not be serialized.
    #[error("failed to encode callback: {0}")]
    Encode(#[from] serde_json::Error),

    /// The relay endpoint refused or failed the handshake.
    #[error("failed to dial relay endpoint {url}: {source}")]
    Dial {
        /// Endpoint dialed.
        url: String,
        /// Handshake error.
        #[source]
        source: tungstenite::Error,
    },

    /// The frame could not be written after connecting.
    #[error("failed to send callback to relay endpoint: {0}")]
    Send(#[source] tungstenite::Error),
}

/// What the relay did with a notification.
#[derive(Debug, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Fanned out in this call.
    Delivered(FanOutReport),
    /// Handed to the `/ws/payment` endpoint, which fans it out on receipt.
    Forwarded,
}

/// How callbacks reach waiting connections.
#[derive(Clone)]
pub enum CallbackRelay {
    /// Call the registry fan-out directly.
    InProcess(Arc<ConnectionRegistry>),
    /// Dial a `/ws/payment` endpoint without a `ref`, send one frame, close.
    Loopback {
        /// `ws://` URL of the `/ws/payment` endpoint to dial.
        url: String,
    },
}

impl CallbackRelay {
    /// Hand `notification` to the sockets registered under its `ref2`.
    #[instrument(skip_all, fields(ref2 = %notification.key2, mode = self.mode_name()))]
    pub async fn relay(
        &self,
        notification: &CallbackNotification,
    ) -> Result<RelayOutcome, RelayError> {
        match self {
            Self::InProcess(registry) => {
                let report = fanout::fan_out(registry, notification);
                info!(
                    delivered = report.delivered.len(),
                    failed = report.failed.len(),
                    "callback relayed"
                );
                Ok(RelayOutcome::Delivered(report))
            }
            Self::Loopback { url } => {
                let json = notification.to_json()?;
                let (mut ws, _) = connect_async(url.as_str())
                    .await
                    .map_err(|source| RelayError::Dial {
                        url: url.clone(),
                        source,
                    })?;
                ws.send(Message::Text(json.into()))
                    .await
                    .map_err(RelayError::Send)?;
                if let Err(e) = ws.close(None).await {
                    debug!(error = %e, "relay socket close failed");
                }
                info!(url = %url, "callback forwarded");
                Ok(RelayOutcome::Forwarded)
            }
        }
    }

    fn mode_name(&self) -> &'static str {
        match self {
            Self::InProcess(_) => "in_process",
            Self::Loopback { .. } => "loopback",
        }
    }
}
