//! Settings loading: compiled defaults, then `~/.canvas/settings.json`
//! deep-merged on top, then `CANVAS_*` environment overrides.
//!
//! Deep merge: objects merge per key, arrays and primitives are replaced,
//! nulls in the file are skipped.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{canvas_home, CanvasSettings, ConcurrentStreamPolicy, LogLevel};

pub fn settings_path() -> PathBuf {
    canvas_home().join("settings.json")
}

pub fn load_settings() -> Result<CanvasSettings> {
    load_settings_from_path(&settings_path())
}

/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CanvasSettings> {
    let defaults = serde_json::to_value(CanvasSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CanvasSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

fn validate(settings: &CanvasSettings) -> Result<()> {
    if !settings.server.chat_path.starts_with('/') {
        return Err(SettingsError::InvalidValue(format!(
            "server.chatPath must start with '/': {}",
            settings.server.chat_path
        )));
    }
    if settings.stream.max_buffer_bytes == 0 {
        return Err(SettingsError::InvalidValue(
            "stream.maxBufferBytes must be positive".to_string(),
        ));
    }
    Ok(())
}

pub fn apply_env_overrides(settings: &mut CanvasSettings) {
    apply_overrides_with(settings, |key| std::env::var(key).ok());
}

/// Apply overrides from any key lookup. Invalid values are logged and ignored.
pub fn apply_overrides_with(settings: &mut CanvasSettings, lookup: impl Fn(&str) -> Option<String>) {
    let string = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(v) = string("CANVAS_BASE_URL") {
        settings.server.base_url = v;
    }
    if let Some(v) = string("CANVAS_CHAT_PATH") {
        settings.server.chat_path = v;
    }
    if let Some(v) = string("CANVAS_USER_ID") {
        settings.identity.user_id = Some(v);
    }
    if let Some(v) = string("CANVAS_ASSISTANT_ID") {
        settings.identity.assistant_id = Some(v);
    }
    if let Some(v) = read_parsed(&lookup, "CANVAS_MAX_BUFFER_BYTES", |v| {
        parse_usize_range(v, 1024, 64 * 1024 * 1024)
    }) {
        settings.stream.max_buffer_bytes = v;
    }
    if let Some(v) = read_parsed(&lookup, "CANVAS_STREAM_POLICY", |v| {
        v.parse::<ConcurrentStreamPolicy>().ok()
    }) {
        settings.stream.concurrent_policy = v;
    }
    if let Some(v) = string("CANVAS_DB_PATH") {
        settings.storage.database_path = v;
    }
    if let Some(v) = read_parsed(&lookup, "CANVAS_LOG_LEVEL", |v| v.parse::<LogLevel>().ok()) {
        settings.logging.level = v;
    }
    if let Some(v) = read_parsed(&lookup, "CANVAS_LOG_TO_SQLITE", parse_bool) {
        settings.logging.log_to_sqlite = v;
    }
    if let Some(v) = string("CANVAS_LOG_DB") {
        settings.logging.log_db_path = v;
    }
}

fn read_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = lookup(key)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!(key, value = %raw, "invalid env var value, ignoring");
    }
    parsed
}

/// Accepts `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off`, any case.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
