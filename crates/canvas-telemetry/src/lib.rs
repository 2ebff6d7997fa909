mod logging;

pub use logging::{LogQuery, LogRecord, SqliteLogLayer, SqliteLogSink};

use std::path::PathBuf;
use std::sync::Arc;

use canvas_settings::{LogLevel, LoggingSettings};
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by RUST_LOG.
    pub log_level: Level,
    /// Per-module level overrides, e.g. `("canvas_stream", DEBUG)`.
    pub module_levels: Vec<(String, Level)>,
    /// Persist warn+ events to SQLite.
    pub log_to_sqlite: bool,
    pub log_db_path: PathBuf,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self::from_settings(&LoggingSettings::default())
    }
}

impl TelemetryConfig {
    pub fn from_settings(settings: &LoggingSettings) -> Self {
        Self {
            log_level: to_level(settings.level),
            module_levels: Vec::new(),
            log_to_sqlite: settings.log_to_sqlite,
            log_db_path: PathBuf::from(&settings.log_db_path),
        }
    }

    fn filter_directive(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push_str(&format!(",{}={}", module, level.to_string().to_lowercase()));
        }
        filter
    }
}

fn to_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

/// Keeps the log sink alive for the life of the process.
pub struct TelemetryGuard {
    log_sink: Option<Arc<SqliteLogSink>>,
}

impl TelemetryGuard {
    /// Persisted warn+ logs, if SQLite logging is on.
    pub fn logs(&self) -> Option<&SqliteLogSink> {
        self.log_sink.as_deref()
    }
}

/// Install the global subscriber: JSON lines on stderr plus the optional
/// SQLite layer. Call once at startup.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_span_list(true)
        .with_filter(env_filter);

    let (sqlite_layer, sqlite_sink) = if config.log_to_sqlite {
        match SqliteLogSink::new(&config.log_db_path) {
            Ok(sink) => {
                let sink = Arc::new(sink);
                (Some(SqliteLogLayer::new(sink.clone())), Some(sink))
            }
            Err(e) => {
                eprintln!("canvas-telemetry: failed to open log DB: {e}");
                (None, None)
            }
        }
    } else {
        (None, None)
    };

    if let Err(e) = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(sqlite_layer)
        .try_init()
    {
        eprintln!("canvas-telemetry: subscriber already installed: {e}");
    }

    TelemetryGuard {
        log_sink: sqlite_sink,
    }
}
