//! `GET /ws/payment?ref=<key>` upgrade and per-connection loop.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use paygate_core::{CallbackNotification, CorrelationKey};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::connection::ConnectionHandle;
use super::fanout;
use crate::server::AppState;

/// Query string of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentQuery {
    /// Correlation key; empty when `ref` is absent.
    #[serde(rename = "ref", default)]
    pub key: String,
}

/// Accepts every upgrade. A missing `ref` registers under the empty key.
pub async fn ws_payment(
    ws: WebSocketUpgrade,
    Query(query): Query<PaymentQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let key = CorrelationKey::new(query.key);
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, key, state))
}

/// Register, pump outbound frames, relay inbound notifications, clean up.
async fn handle_socket(socket: WebSocket, key: CorrelationKey, state: AppState) {
    let (tx, rx) = mpsc::channel(state.send_queue_capacity);
    let handle = Arc::new(ConnectionHandle::new(tx));
    let registration = state
        .registry
        .register_guarded(Arc::clone(&handle), key.clone());
    let conn_id = registration.id();
    info!(%conn_id, key = %key, without_ref = key.is_empty(), "payment socket connected");

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_loop(sink, rx));
    let shutdown = state.shutdown.token();

    loop {
        let frame = tokio::select! {
            () = shutdown.cancelled() => break,
            frame = stream.next() => frame,
        };
        let parsed = match frame {
            Some(Ok(Message::Text(text))) => CallbackNotification::from_json(text.as_str().as_bytes()),
            Some(Ok(Message::Binary(bytes))) => CallbackNotification::from_json(&bytes),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Close(_))) | None => break,
            Some(Err(e)) => {
                debug!(%conn_id, error = %e, "payment socket read failed");
                break;
            }
        };
        match parsed {
            Ok(notification) => {
                let _ = fanout::fan_out(&state.registry, &notification);
            }
            Err(e) => {
                warn!(%conn_id, error = %e, "malformed notification, closing connection");
                break;
            }
        }
    }

    drop(registration);
    writer.abort();
    info!(
        %conn_id,
        age_secs = handle.age().as_secs(),
        dropped = handle.drop_count(),
        "payment socket disconnected"
    );
}

/// Drain the connection's queue into the socket until either side closes.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<String>>,
) {
    while let Some(json) = rx.recv().await {
        if sink.send(Message::Text(json.as_str().into())).await.is_err() {
            break;
        }
    }
    let _ = sink.close().await;
}
