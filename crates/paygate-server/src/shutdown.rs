//! Stopping the listener and draining open payment sockets.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::websocket::registry::ConnectionRegistry;

/// How long [`ShutdownCoordinator::graceful_shutdown`] waits by default.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the cancellation token shared by the listener and every
/// `/ws/payment` read loop, and knows which sockets are still open.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    registry: Arc<ConnectionRegistry>,
}

impl ShutdownCoordinator {
    /// Coordinator draining the sockets tracked by `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            token: CancellationToken::new(),
            registry,
        }
    }

    /// Token cancelled once shutdown begins.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop accepting requests and tell every socket to close. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel, then wait up to `timeout` for the listener task to exit and
    /// the registry to empty. Returns how many sockets were still open.
    pub async fn graceful_shutdown(&self, server: JoinHandle<()>, timeout: Duration) -> usize {
        self.cancel();
        info!(
            open_sockets = self.registry.len(),
            timeout_ms = timeout.as_millis(),
            "draining payment sockets"
        );

        let drain = futures::future::join(server, self.registry.drained());
        let timed_out = tokio::time::timeout(timeout, drain).await.is_err();

        let remaining = self.registry.len();
        if timed_out {
            warn!(remaining, "shutdown timed out after {timeout:?}");
        }
        remaining
    }
}
