//! `PaygateServer`: Axum HTTP + `WebSocket` server.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::Method;
use axum::response::Json;
use axum::routing::{get, post};
use paygate_settings::RelayMode;
use paygate_upstream::{PaymentOrchestrator, UpstreamGateway};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::handlers;
use crate::health::{self, HealthResponse};
use crate::relay::CallbackRelay;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::handler::ws_payment;
use crate::websocket::registry::ConnectionRegistry;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Open `/ws/payment` connections.
    pub registry: Arc<ConnectionRegistry>,
    /// Runs the token and QR hops.
    pub orchestrator: PaymentOrchestrator,
    /// Where `/callback` sends notifications.
    pub relay: CallbackRelay,
    /// Cancels socket read loops on shutdown.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Process start, for `/health`.
    pub start_time: Instant,
    /// Outbound queue size per socket.
    pub send_queue_capacity: usize,
    /// Largest inbound socket message accepted.
    pub max_message_size: usize,
}

/// The payment relay server.
pub struct PaygateServer {
    config: ServerConfig,
    orchestrator: PaymentOrchestrator,
    registry: Arc<ConnectionRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl PaygateServer {
    /// Server calling upstream through `gateway`. Nothing is bound until
    /// [`listen`](Self::listen).
    pub fn new(config: ServerConfig, gateway: Arc<dyn UpstreamGateway>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            config,
            orchestrator: PaymentOrchestrator::new(gateway),
            shutdown: Arc::new(ShutdownCoordinator::new(Arc::clone(&registry))),
            registry,
            start_time: Instant::now(),
        }
    }

    /// Router for a server whose address is not known yet.
    ///
    /// Loopback mode without a configured URL falls back to in-process
    /// delivery here; [`listen`](Self::listen) derives the URL instead.
    pub fn router(&self) -> Router {
        self.build_router(None)
    }

    fn build_router(&self, local_addr: Option<SocketAddr>) -> Router {
        let state = AppState {
            registry: Arc::clone(&self.registry),
            orchestrator: self.orchestrator.clone(),
            relay: self.relay(local_addr),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            send_queue_capacity: self.config.send_queue_capacity,
            max_message_size: self.config.max_message_size,
        };

        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers(Any);

        Router::new()
            .route("/createpayment", post(handlers::create_payment))
            .route("/callback", post(handlers::callback))
            .route("/ws/payment", get(ws_payment))
            .route("/health", get(health_handler))
            .with_state(state)
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    fn relay(&self, local_addr: Option<SocketAddr>) -> CallbackRelay {
        let in_process = || CallbackRelay::InProcess(Arc::clone(&self.registry));
        match self.config.relay_mode {
            RelayMode::InProcess => in_process(),
            RelayMode::Loopback => {
                let url = self
                    .config
                    .loopback_url
                    .clone()
                    .or_else(|| local_addr.map(loopback_url));
                match url {
                    Some(url) => CallbackRelay::Loopback { url },
                    None => {
                        warn!("loopback relay has no target yet, delivering in-process");
                        in_process()
                    }
                }
            }
        }
    }

    /// Bind, then serve until the shutdown token is cancelled.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener =
            tokio::net::TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let router = self.build_router(Some(addr));
        let token = self.shutdown.token();

        info!(%addr, relay = ?self.config.relay_mode, "paygate server listening");

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(token.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!(error = %e, "server error");
            }
        });
        Ok((addr, handle))
    }

    /// Registry of open payment sockets.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Coordinator that stops the listener and drains sockets.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }
}

/// `ws://` URL of our own `/ws/payment`, with wildcard binds dialed on loopback.
fn loopback_url(addr: SocketAddr) -> String {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    format!("ws://{}/ws/payment", SocketAddr::new(ip, addr.port()))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time, state.registry.len()))
}
