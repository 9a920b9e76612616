//! # paygate-telemetry
//!
//! Installs the global `tracing` subscriber: an [`EnvFilter`] built from
//! `RUST_LOG` (when set) or the configured levels, and a `fmt` layer that
//! writes either JSON lines or human-readable output to stdout.

#![deny(unsafe_code)]

use paygate_settings::LoggingSettings;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Build the filter directive string, e.g. `info,paygate_server=debug`.
pub fn filter_directives(settings: &LoggingSettings) -> String {
    let mut filter = settings.level.to_lowercase();
    for (module, level) in &settings.modules {
        filter.push_str(&format!(",{}={}", module, level.to_lowercase()));
    }
    filter
}

/// Initialize the global subscriber. Call once at startup.
///
/// Returns an error if a global subscriber is already installed.
pub fn init_telemetry(
    settings: &LoggingSettings,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let directives = filter_directives(settings);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let fmt_layer = if settings.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .try_init()
}
