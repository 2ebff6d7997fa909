//! Session manager: locate, create, switch, delete and prune conversation
//! threads, and route one response stream at a time into the active thread.
//!
//! Every collaborator call happens before in-memory state is touched, so a
//! failed call leaves the live session as it was.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use canvas_core::artifact::{Artifact, ContentPayload, ContentVersion};
use canvas_core::comments::{Author, Comment, CommentThread, ThreadStatus};
use canvas_core::identity::IdentityProvider;
use canvas_core::ids::{CommentId, CommentThreadId, ThreadId, UserId};
use canvas_core::messages::Message;
use canvas_core::persistence::{Thread, ThreadStore};
use canvas_core::transport::{StreamRequest, StreamTransport};
use canvas_doc::{
    AnchorStatus, AnnotationStore, ArtifactVersionStore, Direction, LiveSelection, NodeId,
    OffsetMapper, QuickStart, RenderTree, VersionError,
};
use canvas_settings::{ConcurrentStreamPolicy, StreamSettings};
use canvas_stream::{
    ChunkPayload, StreamChunk, StreamPump, StreamStatus, StreamSummary, DEFAULT_MAX_BUFFER,
};

use crate::error::SessionError;
use crate::live::LiveSession;
use crate::selection::Selection;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub policy: ConcurrentStreamPolicy,
    /// Frame buffer limit for each stream's decoder.
    pub max_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            policy: ConcurrentStreamPolicy::Reject,
            max_buffer: DEFAULT_MAX_BUFFER,
        }
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &StreamSettings) -> Self {
        Self {
            policy: settings.concurrent_policy,
            max_buffer: settings.max_buffer_bytes,
        }
    }
}

/// What applying one chunk did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Data was decoded into the live thread; the stream goes on.
    Applied,
    /// The chunk belongs to a stream that is no longer current.
    Ignored,
    Completed(StreamSummary),
    Cancelled,
}

struct ActiveStream {
    generation: u64,
    thread_id: ThreadId,
    cancel: CancellationToken,
}

/// Forget the active stream and trip its token so the pump drops the
/// transport handle on its next read.
fn release(stream: &mut Option<ActiveStream>) {
    if let Some(stream) = stream.take() {
        stream.cancel.cancel();
    }
}

pub struct SessionManager {
    store: Arc<dyn ThreadStore>,
    transport: Arc<dyn StreamTransport>,
    identity: Arc<dyn IdentityProvider>,
    config: SessionConfig,
    live: Option<LiveSession>,
    stream: Option<ActiveStream>,
    next_generation: u64,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn ThreadStore>,
        transport: Arc<dyn StreamTransport>,
        identity: Arc<dyn IdentityProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            store,
            transport,
            identity,
            config,
            live: None,
            stream: None,
            next_generation: 0,
        }
    }

    // ── threads ──────────────────────────────────────────────────────────

    /// Adopt the user's latest thread, or create one if they have none.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn search_or_create(&mut self, user_id: &UserId) -> Result<ThreadId> {
        let thread = match self.store.find_latest_for_user(user_id).await? {
            Some(thread) => {
                debug!(thread_id = %thread.id, "adopting latest thread");
                thread
            }
            None => self.store.create(user_id).await?,
        };
        self.adopt(thread)
    }

    /// Start a fresh thread and make it active.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_thread(&mut self, user_id: &UserId) -> Result<ThreadId> {
        let thread = self.store.create(user_id).await?;
        self.adopt(thread)
    }

    /// Make `thread_id` the active thread, replacing all in-memory state.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn switch(&mut self, thread_id: &ThreadId) -> Result<()> {
        let thread = self.store.get(thread_id).await?;
        self.adopt(thread).map(|_| ())
    }

    /// Delete a thread. Returns whether it was the active one; no other
    /// thread is selected in its place.
    #[instrument(skip_all, fields(thread_id = %thread_id))]
    pub async fn delete(&mut self, thread_id: &ThreadId) -> Result<bool> {
        self.store.delete(thread_id).await?;
        let was_active = self.thread_id() == Some(thread_id);
        if was_active {
            self.stop_stream();
            self.live = None;
            info!("active thread deleted");
        }
        Ok(was_active)
    }

    /// Remove the user's threads that never received values. The active
    /// thread is always kept.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn prune_empty(&mut self, user_id: &UserId) -> Result<Vec<ThreadId>> {
        let keep = self.thread_id().cloned();
        let removed = self
            .store
            .delete_empty_for_user(user_id, keep.as_ref())
            .await?;
        if !removed.is_empty() {
            info!(removed = removed.len(), "pruned empty threads");
        }
        Ok(removed)
    }

    pub async fn list_threads(&self, user_id: &UserId) -> Result<Vec<Thread>> {
        Ok(self.store.list_for_user(user_id).await?)
    }

    /// Write the live messages and artifact into the thread record, then
    /// mark the artifact saved.
    #[instrument(skip_all)]
    pub async fn persist(&mut self) -> Result<()> {
        let live = self.live()?;
        let thread_id = live.thread_id.clone();
        let values = live.snapshot();
        self.store.save_values(&thread_id, &values).await?;
        self.live_mut()?.versions.mark_saved();
        debug!(thread_id = %thread_id, messages = values.messages.len(), "thread persisted");
        Ok(())
    }

    fn adopt(&mut self, thread: Thread) -> Result<ThreadId> {
        let live = LiveSession::load(thread, self.config.max_buffer)?;
        self.stop_stream();
        let thread_id = live.thread_id.clone();
        self.live = Some(live);
        info!(thread_id = %thread_id, "thread active");
        Ok(thread_id)
    }

    // ── streaming ────────────────────────────────────────────────────────

    /// Append a user message and open a response stream for it.
    ///
    /// Feed the returned pump's chunks to [`apply_chunk`](Self::apply_chunk),
    /// or hand the pump to [`drive`](Self::drive).
    #[instrument(skip_all)]
    pub async fn send_message(&mut self, content: &str) -> Result<StreamPump> {
        let user_id = self.identity.user_id().ok_or(SessionError::MissingIdentity("user"))?;
        let assistant_id = self
            .identity
            .assistant_id()
            .ok_or(SessionError::MissingIdentity("assistant"))?;

        if self.live()?.consumer.is_streaming() {
            match self.config.policy {
                ConcurrentStreamPolicy::Reject => return Err(SessionError::StreamInFlight),
                ConcurrentStreamPolicy::Replace => {
                    info!("replacing in-flight stream");
                    self.stop_stream();
                }
            }
        }

        let live = self.live_mut()?;
        live.messages.push(Message::user(content));
        let request = StreamRequest {
            thread_id: live.thread_id.clone(),
            assistant_id,
            user_id,
            messages: live.messages.clone(),
            highlighted: live.selection.highlighted(),
            artifact: live.versions.artifact().cloned(),
        };
        live.consumer.begin()?;

        let opened = self.transport.open_stream(&request).await;
        let live = self.live_mut()?;
        let inner = match opened {
            Ok(inner) => inner,
            Err(e) => return Err(live.consumer.fail(e).into()),
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let cancel = CancellationToken::new();
        self.stream = Some(ActiveStream {
            generation,
            thread_id: request.thread_id.clone(),
            cancel: cancel.clone(),
        });
        info!(thread_id = %request.thread_id, generation, "stream opened");
        Ok(StreamPump::new(generation, request.thread_id, inner, cancel))
    }

    /// Apply one chunk from a pump. Chunks of an abandoned stream, or of a
    /// thread that is no longer active, are ignored.
    pub fn apply_chunk(&mut self, chunk: StreamChunk) -> Result<ChunkOutcome> {
        let current = self.stream.as_ref().is_some_and(|s| {
            s.generation == chunk.generation && s.thread_id == chunk.thread_id
        });
        let live = match self.live.as_mut() {
            Some(live) if current && live.thread_id == chunk.thread_id => live,
            _ => {
                debug!(generation = chunk.generation, "ignoring chunk from abandoned stream");
                return Ok(ChunkOutcome::Ignored);
            }
        };

        match chunk.payload {
            ChunkPayload::Data(bytes) => {
                let (consumer, target) = live.target();
                if let Err(e) = consumer.ingest(&bytes, target) {
                    release(&mut self.stream);
                    return Err(e.into());
                }
                Ok(ChunkOutcome::Applied)
            }
            ChunkPayload::Closed => {
                release(&mut self.stream);
                Ok(ChunkOutcome::Completed(live.consumer.complete()?))
            }
            ChunkPayload::Failed(e) => {
                release(&mut self.stream);
                Err(live.consumer.fail(e).into())
            }
            ChunkPayload::Cancelled => {
                release(&mut self.stream);
                live.consumer.cancel();
                Ok(ChunkOutcome::Cancelled)
            }
        }
    }

    /// Run a pump to its end. Edits cannot interleave while this runs; use
    /// [`apply_chunk`](Self::apply_chunk) directly for that.
    pub async fn drive(&mut self, mut pump: StreamPump) -> Result<ChunkOutcome> {
        while let Some(chunk) = pump.next().await {
            match self.apply_chunk(chunk)? {
                ChunkOutcome::Applied => {}
                outcome => return Ok(outcome),
            }
        }
        Ok(ChunkOutcome::Ignored)
    }

    /// Cancel the in-flight stream, keeping what it produced. Returns
    /// whether anything was streaming.
    pub fn cancel_stream(&mut self) -> bool {
        release(&mut self.stream);
        self.live.as_mut().is_some_and(|live| live.consumer.cancel())
    }

    fn stop_stream(&mut self) {
        let _ = self.cancel_stream();
    }

    // ── artifact edits ───────────────────────────────────────────────────

    /// Seed a thread without an artifact from a quick-start template.
    pub fn quick_start(&mut self, start: QuickStart) -> Result<&ContentVersion> {
        let live = self.live_mut()?;
        if live.versions.artifact().is_some() {
            return Err(SessionError::ArtifactExists);
        }
        live.versions
            .replace(Artifact::with_first_version(start.title(), start.first_version()))?;
        Ok(live.versions.current().ok_or(VersionError::NoArtifact)?)
    }

    pub fn create_version(&mut self, payload: ContentPayload, title: &str) -> Result<&ContentVersion> {
        Ok(self.live_mut()?.versions.create_version(payload, title)?)
    }

    pub fn update_current(&mut self, payload: ContentPayload) -> Result<()> {
        Ok(self.live_mut()?.versions.update_current(payload)?)
    }

    pub fn navigate(&mut self, direction: Direction) -> Result<bool> {
        Ok(self.live_mut()?.versions.navigate(direction))
    }

    pub fn select_version(&mut self, index: u32) -> Result<()> {
        Ok(self.live_mut()?.versions.select_version(index)?)
    }

    /// Project the current version into a fresh render tree.
    pub fn render(&self) -> Option<RenderTree> {
        let (text, _) = self.live.as_ref()?.current_text()?;
        Some(RenderTree::project(text))
    }

    // ── selection and comments ───────────────────────────────────────────

    /// Map a live selection in `tree` to the pending selection. A collapsed
    /// selection or one that leaves `container` clears it.
    pub fn update_selection(
        &mut self,
        tree: &RenderTree,
        container: NodeId,
        selection: &LiveSelection,
    ) -> Result<Option<&Selection>> {
        let live = self.live_mut()?;
        let Some((canonical, index)) = live.current_text().map(|(t, i)| (t.to_owned(), i)) else {
            live.selection.clear();
            return Ok(None);
        };
        let mapper = OffsetMapper::new(tree, container);
        if mapper.canonical_text() != canonical {
            live.selection.clear();
            return Err(SessionError::StaleSelection);
        }
        let mapping = mapper.map_selection(selection);
        Ok(live.selection.update(mapping, &canonical, index))
    }

    pub fn clear_selection(&mut self) {
        if let Some(live) = self.live.as_mut() {
            live.selection.clear();
        }
    }

    /// Open a comment thread over the pending selection. The anchor text is
    /// checked against the current content first.
    pub fn add_comment(&mut self, author: Author, initial: &str) -> Result<CommentThreadId> {
        let live = self.live_mut()?;
        let selection = live.selection.current().cloned().ok_or(SessionError::NoSelection)?;
        let (canonical, index) = live
            .current_text()
            .map(|(t, i)| (t.to_owned(), i))
            .ok_or(SessionError::NoSelection)?;
        if !live.selection.matches(&canonical, index) {
            live.selection.clear();
            return Err(SessionError::StaleSelection);
        }

        let thread_id = live
            .annotations
            .open_thread(&canonical, selection.range, &selection.text, author, initial)?
            .id
            .clone();
        live.annotations.set_active(Some(&thread_id))?;
        live.selection.clear();
        Ok(thread_id)
    }

    pub fn reply(&mut self, thread_id: &CommentThreadId, author: Author, content: &str) -> Result<Comment> {
        Ok(self.live_mut()?.annotations.reply(thread_id, author, content)?)
    }

    pub fn reply_to_comment(
        &mut self,
        thread_id: &CommentThreadId,
        comment_id: &CommentId,
        author: Author,
        content: &str,
    ) -> Result<Comment> {
        Ok(self
            .live_mut()?
            .annotations
            .reply_to_comment(thread_id, comment_id, author, content)?)
    }

    pub fn toggle_resolved(&mut self, thread_id: &CommentThreadId) -> Result<ThreadStatus> {
        Ok(self.live_mut()?.annotations.toggle_resolved(thread_id)?)
    }

    pub fn set_active_comment_thread(&mut self, thread_id: Option<&CommentThreadId>) -> Result<()> {
        Ok(self.live_mut()?.annotations.set_active(thread_id)?)
    }

    pub fn remove_comment_thread(&mut self, thread_id: &CommentThreadId) -> Result<CommentThread> {
        Ok(self.live_mut()?.annotations.remove_thread(thread_id)?)
    }

    /// Whether a comment thread still covers its anchor text in the current
    /// version.
    pub fn anchor_status(&self, thread_id: &CommentThreadId) -> Result<AnchorStatus> {
        let live = self.live()?;
        let canonical = live.current_text().map_or("", |(t, _)| t);
        Ok(live.annotations.anchor_status(thread_id, canonical)?)
    }

    // ── accessors ────────────────────────────────────────────────────────

    pub fn thread_id(&self) -> Option<&ThreadId> {
        self.live.as_ref().map(|l| &l.thread_id)
    }

    pub fn messages(&self) -> &[Message] {
        self.live
            .as_ref()
            .map(|l| l.messages.as_slice())
            .unwrap_or_default()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.live.as_ref()?.versions.artifact()
    }

    pub fn versions(&self) -> Option<&ArtifactVersionStore> {
        self.live.as_ref().map(|l| &l.versions)
    }

    pub fn annotations(&self) -> Option<&AnnotationStore> {
        self.live.as_ref().map(|l| &l.annotations)
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.live.as_ref()?.selection.current()
    }

    pub fn stream_status(&self) -> StreamStatus {
        self.live
            .as_ref()
            .map_or(StreamStatus::Idle, |l| l.consumer.status())
    }

    pub fn is_streaming(&self) -> bool {
        self.live.as_ref().is_some_and(|l| l.consumer.is_streaming())
    }

    pub fn first_token_received(&self) -> bool {
        self.live
            .as_ref()
            .is_some_and(|l| l.consumer.first_token_received())
    }

    /// True when there is nothing unsaved in the active thread's artifact.
    pub fn is_artifact_saved(&self) -> bool {
        self.live.as_ref().map_or(true, |l| l.versions.is_saved())
    }

    fn live(&self) -> Result<&LiveSession> {
        self.live.as_ref().ok_or(SessionError::NoActiveThread)
    }

    fn live_mut(&mut self) -> Result<&mut LiveSession> {
        self.live.as_mut().ok_or(SessionError::NoActiveThread)
    }
}
