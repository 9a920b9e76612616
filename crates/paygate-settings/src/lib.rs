//! # paygate-settings
//!
//! Configuration for the payment relay, loaded from three layers (in
//! priority order):
//! 1. **Compiled defaults** : [`PaygateSettings::default()`]
//! 2. **Settings file** : `~/.paygate/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables** : `PAYGATE_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings_from_path, settings_path};
pub use types::*;
