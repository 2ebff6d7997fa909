//! # canvas
//!
//! Command-line front end for the artifact canvas core: thread housekeeping,
//! offline replay of recorded response streams, and one-shot chat.

#![deny(unsafe_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::Level;

use canvas_core::identity::StaticIdentity;
use canvas_core::ids::{AssistantId, ThreadId, UserId};
use canvas_core::messages::{Message, Role};
use canvas_doc::ArtifactVersionStore;
use canvas_session::{ChunkOutcome, SessionConfig, SessionManager};
use canvas_settings::{get_settings, CanvasSettings};
use canvas_store::{Database, ThreadRepo};
use canvas_stream::{HttpTransport, StreamConsumer, StreamTarget};
use canvas_telemetry::{init_telemetry, LogQuery, SqliteLogSink, TelemetryConfig, TelemetryGuard};

#[derive(Parser, Debug)]
#[command(name = "canvas", about = "Artifact canvas threads and streams")]
struct Cli {
    /// Thread database (defaults to `storage.databasePath`).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// User id (defaults to `identity.userId`).
    #[arg(long, global = true)]
    user: Option<String>,

    /// Assistant id (defaults to `identity.assistantId`).
    #[arg(long, global = true)]
    assistant: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect and clean up conversation threads.
    Threads {
        #[command(subcommand)]
        action: ThreadsAction,
    },
    /// Feed a recorded response stream through a fresh consumer.
    Replay {
        file: PathBuf,
        /// Bytes per simulated transport chunk.
        #[arg(long, default_value = "64")]
        chunk_size: usize,
    },
    /// Send one message and stream the reply. Ctrl-C cancels, keeping
    /// whatever arrived.
    Chat {
        message: String,
        /// Start a new thread instead of reusing the latest one.
        #[arg(long)]
        new_thread: bool,
    },
    /// Show persisted warnings and errors, newest first.
    Logs {
        /// Only this level (`warn` or `error`).
        #[arg(long)]
        level: Option<Level>,
        /// Substring of the event target, e.g. `canvas_stream`.
        #[arg(long)]
        target: Option<String>,
        #[arg(long)]
        thread: Option<String>,
        /// RFC 3339 timestamp.
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        #[arg(long, default_value = "50")]
        limit: u32,
    },
}

#[derive(Subcommand, Debug)]
enum ThreadsAction {
    List,
    /// Delete threads that never received any values.
    Prune,
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = get_settings();
    let telemetry = init_telemetry(TelemetryConfig::from_settings(&settings.logging));

    match &cli.command {
        Command::Logs { level, target, thread, since, limit } => {
            let query = LogQuery {
                level: *level,
                target: target.clone(),
                thread_id: thread.clone(),
                since: *since,
                limit: Some(*limit),
            };
            logs(&telemetry, settings, &query)
        }
        Command::Replay { file, chunk_size } => replay(settings, file, *chunk_size),
        Command::Threads { action } => {
            let user = user_id(&cli, settings)?;
            let mut manager = session_manager(&cli, settings, StaticIdentity::default())?;
            threads(&mut manager, &user, action).await
        }
        Command::Chat { message, new_thread } => {
            let user = user_id(&cli, settings)?;
            let assistant = cli
                .assistant
                .clone()
                .or_else(|| settings.identity.assistant_id.clone())
                .context("no assistant id; pass --assistant or set identity.assistantId")?;
            let identity = StaticIdentity::new(user.clone(), AssistantId::from_raw(assistant));
            let mut manager = session_manager(&cli, settings, identity)?;
            chat(&mut manager, &user, message, *new_thread).await
        }
    }
}

fn user_id(cli: &Cli, settings: &CanvasSettings) -> Result<UserId> {
    let Some(raw) = cli.user.clone().or_else(|| settings.identity.user_id.clone()) else {
        bail!("no user id; pass --user or set identity.userId");
    };
    Ok(UserId::from_raw(raw))
}

fn session_manager(
    cli: &Cli,
    settings: &CanvasSettings,
    identity: StaticIdentity,
) -> Result<SessionManager> {
    let db_path = cli
        .db_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.storage.database_path));
    let db = Database::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.display()))?;
    let transport = HttpTransport::new(&settings.server.base_url, &settings.server.chat_path)
        .context("failed to build HTTP transport")?;
    Ok(SessionManager::new(
        Arc::new(ThreadRepo::new(db)),
        Arc::new(transport),
        Arc::new(identity),
        SessionConfig::from_settings(&settings.stream),
    ))
}

async fn threads(manager: &mut SessionManager, user: &UserId, action: &ThreadsAction) -> Result<()> {
    match action {
        ThreadsAction::List => {
            for thread in manager.list_threads(user).await? {
                let summary = match &thread.values {
                    None => "empty".to_string(),
                    Some(values) => format!(
                        "{} messages{}",
                        values.messages.len(),
                        values
                            .artifact
                            .as_ref()
                            .map(|a| format!(", artifact \"{}\" ({} versions)", a.title, a.contents.len()))
                            .unwrap_or_default()
                    ),
                };
                println!("{}\t{}\t{}", thread.id, thread.created_at, summary);
            }
        }
        ThreadsAction::Prune => {
            let removed = manager.prune_empty(user).await?;
            println!("removed {} empty thread(s)", removed.len());
        }
        ThreadsAction::Delete { id } => {
            manager.delete(&ThreadId::from_raw(id.as_str())).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

fn replay(settings: &CanvasSettings, file: &Path, chunk_size: usize) -> Result<()> {
    let raw = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let mut messages: Vec<Message> = Vec::new();
    let mut versions = ArtifactVersionStore::new();
    let mut consumer = StreamConsumer::new(settings.stream.max_buffer_bytes);

    consumer.begin()?;
    for chunk in raw.chunks(chunk_size.max(1)) {
        consumer.ingest(
            chunk,
            StreamTarget {
                messages: &mut messages,
                versions: &mut versions,
            },
        )?;
    }
    let summary = consumer.complete()?;

    println!(
        "tokens: {}  artifacts: {}  skipped: {}",
        summary.tokens, summary.artifacts, summary.skipped
    );
    for message in &messages {
        println!("[{}] {}", message.role.as_str(), message.content);
    }
    if let Some(artifact) = versions.artifact() {
        println!("{}", serde_json::to_string_pretty(artifact)?);
    }
    Ok(())
}

fn logs(telemetry: &TelemetryGuard, settings: &CanvasSettings, query: &LogQuery) -> Result<()> {
    let opened;
    let sink = match telemetry.logs() {
        Some(sink) => sink,
        None => {
            let path = Path::new(&settings.logging.log_db_path);
            opened = SqliteLogSink::new(path)
                .with_context(|| format!("failed to open log database {}", path.display()))?;
            &opened
        }
    };

    let records = sink.query(query).context("failed to query logs")?;
    for record in &records {
        let thread = record.thread_id.as_deref().unwrap_or("-");
        print!("{} {:5} {} [{}] {}", record.timestamp, record.level, record.target, thread, record.message);
        match &record.fields {
            Some(fields) => println!(" {fields}"),
            None => println!(),
        }
    }
    eprintln!("{} of {} record(s)", records.len(), sink.count()?);
    Ok(())
}

async fn chat(manager: &mut SessionManager, user: &UserId, message: &str, new_thread: bool) -> Result<()> {
    let thread_id = if new_thread {
        manager.create_thread(user).await?
    } else {
        manager.search_or_create(user).await?
    };
    tracing::info!(thread_id = %thread_id, "chatting");

    let mut pump = manager.send_message(message).await?;
    let cancel = pump.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut printed = 0;
    let mut result = Ok(ChunkOutcome::Applied);
    while let Some(chunk) = pump.next().await {
        result = manager.apply_chunk(chunk);
        printed = echo_reply(manager.messages(), printed)?;
        if !matches!(result, Ok(ChunkOutcome::Applied)) {
            break;
        }
    }
    println!();

    // Partial replies are kept, so save before reporting a failure.
    manager.persist().await?;
    match result? {
        ChunkOutcome::Cancelled => eprintln!("cancelled"),
        ChunkOutcome::Completed(summary) if summary.skipped > 0 => {
            eprintln!("skipped {} undecodable frame(s)", summary.skipped);
        }
        _ => {}
    }
    Ok(())
}

/// Print whatever the live assistant message gained since the last call.
fn echo_reply(messages: &[Message], printed: usize) -> Result<usize> {
    let Some(reply) = messages.last().filter(|m| m.role == Role::Assistant) else {
        return Ok(printed);
    };
    if let Some(fresh) = reply.content.get(printed..) {
        print!("{fresh}");
        std::io::stdout().flush()?;
    }
    Ok(reply.content.len())
}
