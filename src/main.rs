//! # paygate
//!
//! Payment relay binary: loads settings, installs logging, and runs the
//! HTTP/WebSocket server until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use paygate_server::{DEFAULT_SHUTDOWN_TIMEOUT, PaygateServer, ServerConfig};
use paygate_settings::PaygateSettings;
use paygate_upstream::HttpGateway;

/// Payment gateway relay server.
#[derive(Parser, Debug)]
#[command(name = "paygate", about = "Payment gateway relay server")]
struct Cli {
    /// Settings file (default `~/.paygate/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind (overrides settings; 0 for auto-assign).
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    fn apply(&self, settings: &mut PaygateSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
    }
}

fn build_gateway(settings: &PaygateSettings) -> Result<HttpGateway> {
    let connect = settings.upstream.connect_timeout_secs.map(Duration::from_secs);
    let request = settings.upstream.request_timeout_secs.map(Duration::from_secs);
    HttpGateway::new(connect, request).context("Failed to build upstream HTTP client")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_path = args
        .config
        .clone()
        .unwrap_or_else(paygate_settings::settings_path);
    let mut settings = paygate_settings::load_settings_from_path(&settings_path)
        .with_context(|| format!("Failed to load settings from {}", settings_path.display()))?;
    args.apply(&mut settings);

    paygate_telemetry::init_telemetry(&settings.logging)
        .context("Failed to initialize logging")?;

    let gateway = Arc::new(build_gateway(&settings)?);
    let server = PaygateServer::new(ServerConfig::from_settings(&settings), gateway);
    let (addr, handle) = server
        .listen()
        .await
        .context("Failed to bind server")?;

    tracing::info!("paygate listening on http://{addr}");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let remaining = server
        .shutdown()
        .graceful_shutdown(handle, DEFAULT_SHUTDOWN_TIMEOUT)
        .await;
    tracing::info!(remaining, "Shutdown complete");
    Ok(())
}
