//! Settings type definitions.
//!
//! Field names are camelCase on disk. Every section has `#[serde(default)]`
//! so partial files fill in the rest from [`Default`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root of `~/.canvas/settings.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CanvasSettings {
    pub version: String,
    pub server: ServerSettings,
    pub identity: IdentitySettings,
    pub stream: StreamSettings,
    pub storage: StorageSettings,
    pub logging: LoggingSettings,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            server: ServerSettings::default(),
            identity: IdentitySettings::default(),
            stream: StreamSettings::default(),
            storage: StorageSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Where chat requests are sent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    pub base_url: String,
    pub chat_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            chat_path: "/api/chat".to_string(),
        }
    }
}

/// Identifiers handed to the identity provider. Absent until configured.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentitySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_id: Option<String>,
}

/// What to do when a message is sent while a stream is still running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrentStreamPolicy {
    /// Refuse the new request.
    #[default]
    Reject,
    /// Cancel the running stream, keeping its partial output, then start.
    Replace,
}

impl std::str::FromStr for ConcurrentStreamPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            other => Err(format!("unknown stream policy: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamSettings {
    /// Undecoded bytes allowed in the frame buffer before the stream fails.
    pub max_buffer_bytes: usize,
    pub concurrent_policy: ConcurrentStreamPolicy,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            max_buffer_bytes: 1024 * 1024,
            concurrent_policy: ConcurrentStreamPolicy::Reject,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    pub database_path: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            database_path: canvas_home().join("canvas.db").to_string_lossy().into_owned(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
            .map_err(|_| format!("unknown log level: {s}"))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: LogLevel,
    /// Persist WARN and above into a SQLite log table.
    pub log_to_sqlite: bool,
    pub log_db_path: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            log_to_sqlite: false,
            log_db_path: canvas_home().join("logs.db").to_string_lossy().into_owned(),
        }
    }
}

/// `~/.canvas`, falling back to `/tmp/.canvas` without a home directory.
pub fn canvas_home() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".canvas")
}
