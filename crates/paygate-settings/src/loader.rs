//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PaygateSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `PAYGATE_*` environment variable overrides
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{PaygateSettings, RelayMode};

/// Resolve the default settings path (`~/.paygate/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".paygate").join("settings.json")
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<PaygateSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

fn load_with_env(path: &Path, env: impl Fn(&str) -> Option<String>) -> Result<PaygateSettings> {
    let defaults = serde_json::to_value(PaygateSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PaygateSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `PAYGATE_*` overrides read through `env`.
///
/// Invalid values are logged and ignored (the file/default value stays).
pub fn apply_env_overrides(settings: &mut PaygateSettings, env: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| env(name).filter(|v| !v.is_empty());

    if let Some(v) = read("PAYGATE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_parsed(&read, "PAYGATE_PORT", |v| parse_u16_range(v, 1, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = read_parsed(&read, "PAYGATE_SEND_QUEUE", |v| {
        parse_usize_range(v, 1, 65_536)
    }) {
        settings.server.send_queue_capacity = v;
    }
    if let Some(v) = read_parsed(&read, "PAYGATE_RELAY_MODE", parse_relay_mode) {
        settings.relay.mode = v;
    }
    if let Some(v) = read("PAYGATE_LOOPBACK_URL") {
        settings.relay.loopback_url = Some(v);
    }
    if let Some(v) = read_parsed(&read, "PAYGATE_CONNECT_TIMEOUT_SECS", |v| {
        parse_u64_range(v, 1, 3600)
    }) {
        settings.upstream.connect_timeout_secs = Some(v);
    }
    if let Some(v) = read_parsed(&read, "PAYGATE_REQUEST_TIMEOUT_SECS", |v| {
        parse_u64_range(v, 1, 3600)
    }) {
        settings.upstream.request_timeout_secs = Some(v);
    }
    if let Some(v) = read("PAYGATE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read_parsed(&read, "PAYGATE_LOG_JSON", parse_bool) {
        settings.logging.json = v;
    }
}

fn read_parsed<T>(
    read: impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = read(key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        tracing::warn!(key, value = %raw, "invalid env var, ignoring");
    }
    parsed
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a relay mode (`inProcess`/`in_process`/`loopback`, case-insensitive).
pub fn parse_relay_mode(val: &str) -> Option<RelayMode> {
    match val.to_lowercase().replace(['-', '_'], "").as_str() {
        "inprocess" => Some(RelayMode::InProcess),
        "loopback" => Some(RelayMode::Loopback),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
