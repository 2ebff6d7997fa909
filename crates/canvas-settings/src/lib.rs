//! # canvas-settings
//!
//! Layered configuration for the canvas core.
//!
//! Settings are loaded from three layers, lowest priority first:
//! 1. **Compiled defaults**: [`CanvasSettings::default()`]
//! 2. **User file**: `~/.canvas/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `CANVAS_*` overrides
//!
//! ```no_run
//! use canvas_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("chat endpoint: {}{}", settings.server.base_url, settings.server.chat_path);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, settings_path,
};
pub use types::*;

use std::sync::OnceLock;

static SETTINGS: OnceLock<CanvasSettings> = OnceLock::new();

/// Global settings, loaded on first access. Falls back to defaults if the
/// file cannot be loaded.
pub fn get_settings() -> &'static CanvasSettings {
    SETTINGS.get_or_init(|| load_settings().unwrap_or_default())
}

/// Install settings before the first [`get_settings`] call. Hands the value
/// back if the global was already set.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: CanvasSettings) -> std::result::Result<(), CanvasSettings> {
    SETTINGS.set(settings)
}
