use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::field::{Field, Visit};
use tracing::{span, Level};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

const DEFAULT_QUERY_LIMIT: u32 = 100;

const SCHEMA: &str = "
    PRAGMA journal_mode = WAL;
    PRAGMA synchronous = NORMAL;
    CREATE TABLE IF NOT EXISTS logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        level TEXT NOT NULL,
        target TEXT NOT NULL,
        message TEXT NOT NULL,
        fields TEXT,
        thread_id TEXT,
        user_id TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_logs_level ON logs(level);
    CREATE INDEX IF NOT EXISTS idx_logs_thread ON logs(thread_id);
";

/// One persisted warn+ event.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogRecord {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
    /// Structured event fields other than the message and the ids.
    pub fields: Option<Value>,
    pub thread_id: Option<String>,
    pub user_id: Option<String>,
}

impl LogRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let fields: Option<String> = row.get("fields")?;
        Ok(Self {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            level: row.get("level")?,
            target: row.get("target")?,
            message: row.get("message")?,
            fields: fields.and_then(|f| serde_json::from_str(&f).ok()),
            thread_id: row.get("thread_id")?,
            user_id: row.get("user_id")?,
        })
    }
}

/// Filters for [`SqliteLogSink::query`]. Unset filters match everything.
#[derive(Clone, Debug, Default)]
pub struct LogQuery {
    pub level: Option<Level>,
    /// Substring of the event target.
    pub target: Option<String>,
    pub thread_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
}

impl LogQuery {
    fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut clauses: Vec<(&str, SqlValue)> = Vec::new();
        if let Some(level) = self.level {
            clauses.push(("level =", SqlValue::Text(level_name(level))));
        }
        if let Some(target) = &self.target {
            clauses.push(("target LIKE", SqlValue::Text(format!("%{target}%"))));
        }
        if let Some(thread_id) = &self.thread_id {
            clauses.push(("thread_id =", SqlValue::Text(thread_id.clone())));
        }
        if let Some(since) = self.since {
            clauses.push(("timestamp >=", SqlValue::Text(timestamp(since))));
        }

        let mut sql = String::from("SELECT * FROM logs");
        for (i, (clause, _)) in clauses.iter().enumerate() {
            let joiner = if i == 0 { " WHERE" } else { " AND" };
            sql.push_str(&format!("{joiner} {clause} ?{}", i + 1));
        }
        sql.push_str(&format!(
            " ORDER BY id DESC LIMIT {}",
            self.limit.unwrap_or(DEFAULT_QUERY_LIMIT)
        ));
        (sql, clauses.into_iter().map(|(_, v)| v).collect())
    }
}

fn level_name(level: Level) -> String {
    level.as_str().to_owned()
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite table of warn+ events.
pub struct SqliteLogSink {
    conn: Mutex<Connection>,
}

impl SqliteLogSink {
    pub fn new(db_path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn write(&self, entry: &Entry) {
        let fields = (!entry.fields.is_empty())
            .then(|| serde_json::to_string(&entry.fields).ok())
            .flatten();
        let conn = self.conn.lock();
        // A failed write must not turn into another log event.
        let _ = conn.execute(
            "INSERT INTO logs (timestamp, level, target, message, fields, thread_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![
                timestamp(entry.at),
                level_name(entry.level),
                entry.target,
                entry.message,
                fields,
                entry.thread_id,
                entry.user_id,
            ],
        );
    }

    /// Newest first.
    pub fn query(&self, query: &LogQuery) -> Result<Vec<LogRecord>, rusqlite::Error> {
        let (sql, values) = query.to_sql();
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values), LogRecord::from_row)?;
        rows.collect()
    }

    pub fn count(&self) -> Result<i64, rusqlite::Error> {
        self.conn
            .lock()
            .query_row("SELECT COUNT(*) FROM logs", [], |row| row.get(0))
    }
}

struct Entry {
    at: DateTime<Utc>,
    level: Level,
    target: String,
    message: String,
    fields: Map<String, Value>,
    thread_id: Option<String>,
    user_id: Option<String>,
}

/// Persists warn+ events into a [`SqliteLogSink`], tagging each with the
/// `thread_id`/`user_id` of the event or of its nearest span carrying them.
pub struct SqliteLogLayer {
    sink: Arc<SqliteLogSink>,
}

impl SqliteLogLayer {
    pub fn new(sink: Arc<SqliteLogSink>) -> Self {
        Self { sink }
    }
}

/// Thread and user ids recorded on a span.
#[derive(Clone, Default)]
struct Ids {
    thread_id: Option<String>,
    user_id: Option<String>,
}

impl Ids {
    fn fill_from(&mut self, other: &Ids) {
        if self.thread_id.is_none() {
            self.thread_id.clone_from(&other.thread_id);
        }
        if self.user_id.is_none() {
            self.user_id.clone_from(&other.user_id);
        }
    }

    fn complete(&self) -> bool {
        self.thread_id.is_some() && self.user_id.is_some()
    }

    fn any(&self) -> bool {
        self.thread_id.is_some() || self.user_id.is_some()
    }
}

#[derive(Default)]
struct Collector {
    message: Option<String>,
    ids: Ids,
    fields: Map<String, Value>,
}

impl Collector {
    fn put(&mut self, field: &Field, value: Value) {
        let slot = match field.name() {
            "message" => &mut self.message,
            "thread_id" => &mut self.ids.thread_id,
            "user_id" => &mut self.ids.user_id,
            name => {
                let _ = self.fields.insert(name.to_owned(), value);
                return;
            }
        };
        *slot = Some(match value {
            Value::String(s) => s,
            other => other.to_string(),
        });
    }
}

impl Visit for Collector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.put(field, Value::String(format!("{value:?}")));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, Value::String(value.to_owned()));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.into());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.into());
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, value.into());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.into());
    }
}

impl<S> Layer<S> for SqliteLogLayer
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let mut collector = Collector::default();
        attrs.record(&mut collector);
        if !collector.ids.any() {
            return;
        }
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(collector.ids);
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        if *meta.level() > Level::WARN {
            return;
        }

        let mut collector = Collector::default();
        event.record(&mut collector);
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if collector.ids.complete() {
                    break;
                }
                if let Some(ids) = span.extensions().get::<Ids>() {
                    collector.ids.fill_from(ids);
                }
            }
        }

        self.sink.write(&Entry {
            at: Utc::now(),
            level: *meta.level(),
            target: meta.target().to_owned(),
            message: collector.message.unwrap_or_default(),
            fields: collector.fields,
            thread_id: collector.ids.thread_id,
            user_id: collector.ids.user_id,
        });
    }
}
