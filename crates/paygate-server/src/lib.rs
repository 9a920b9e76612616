//! # paygate-server
//!
//! Axum HTTP + `WebSocket` front of the payment relay.
//!
//! - `POST /createpayment`: two-hop upstream call, QR response passed through
//! - `POST /callback`: relays a payment notification to waiting connections
//! - `GET /ws/payment?ref=<key>`: registers a connection under a correlation key
//! - `GET /health`: liveness and connection count
//! - Graceful shutdown that waits for open payment sockets to close

#![deny(unsafe_code)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use errors::ApiError;
pub use relay::{CallbackRelay, RelayError, RelayOutcome};
pub use server::{AppState, PaygateServer};
pub use shutdown::{DEFAULT_SHUTDOWN_TIMEOUT, ShutdownCoordinator};
pub use websocket::fanout::{DeliveryFailure, FanOutReport};
pub use websocket::registry::{ConnectionId, ConnectionRegistry, Registration};
