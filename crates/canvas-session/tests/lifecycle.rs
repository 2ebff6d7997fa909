use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use canvas_core::artifact::{Artifact, ContentPayload, ContentVersion};
use canvas_core::comments::{Author, ThreadStatus};
use canvas_core::errors::{PersistenceError, TransportError};
use canvas_core::identity::StaticIdentity;
use canvas_core::ids::{AssistantId, ThreadId, UserId};
use canvas_core::messages::Role;
use canvas_core::persistence::{Thread, ThreadStore, ThreadValues};
use canvas_core::range::TextRange;
use canvas_core::stream::FrameEvent;
use canvas_doc::{AnchorStatus, Direction, DomPoint, LiveSelection, ProgrammingLanguage, QuickStart};
use canvas_settings::ConcurrentStreamPolicy;
use canvas_session::{ChunkOutcome, SessionConfig, SessionError, SessionManager};
use canvas_store::{Database, ThreadRepo};
use canvas_stream::{ChunkPayload, FailurePhase, MockResponse, MockTransport, StreamError, StreamStatus};

/// Thread store that can be switched into a failing mode.
struct FlakyStore {
    inner: ThreadRepo,
    failing: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: ThreadRepo::new(Database::in_memory().unwrap()),
            failing: AtomicBool::new(false),
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistenceError::Unavailable("store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ThreadStore for FlakyStore {
    async fn create(&self, user_id: &UserId) -> Result<Thread, PersistenceError> {
        self.check()?;
        ThreadStore::create(&self.inner, user_id).await
    }

    async fn get(&self, id: &ThreadId) -> Result<Thread, PersistenceError> {
        self.check()?;
        ThreadStore::get(&self.inner, id).await
    }

    async fn find_latest_for_user(&self, user_id: &UserId) -> Result<Option<Thread>, PersistenceError> {
        self.check()?;
        ThreadStore::find_latest_for_user(&self.inner, user_id).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Thread>, PersistenceError> {
        self.check()?;
        ThreadStore::list_for_user(&self.inner, user_id).await
    }

    async fn save_values(&self, id: &ThreadId, values: &ThreadValues) -> Result<(), PersistenceError> {
        self.check()?;
        ThreadStore::save_values(&self.inner, id, values).await
    }

    async fn delete(&self, id: &ThreadId) -> Result<(), PersistenceError> {
        self.check()?;
        ThreadStore::delete(&self.inner, id).await
    }

    async fn delete_empty_for_user(
        &self,
        user_id: &UserId,
        keep: Option<&ThreadId>,
    ) -> Result<Vec<ThreadId>, PersistenceError> {
        self.check()?;
        ThreadStore::delete_empty_for_user(&self.inner, user_id, keep).await
    }
}

struct Harness {
    store: Arc<FlakyStore>,
    transport: Arc<MockTransport>,
    manager: SessionManager,
    user: UserId,
}

fn harness_with(policy: ConcurrentStreamPolicy, identity: StaticIdentity) -> Harness {
    let store = Arc::new(FlakyStore::new());
    let transport = Arc::new(MockTransport::default());
    let config = SessionConfig {
        policy,
        ..SessionConfig::default()
    };
    let manager = SessionManager::new(store.clone(), transport.clone(), Arc::new(identity), config);
    Harness {
        store,
        transport,
        manager,
        user: UserId::from_raw("user-1"),
    }
}

fn harness(policy: ConcurrentStreamPolicy) -> Harness {
    harness_with(
        policy,
        StaticIdentity::new(UserId::from_raw("user-1"), AssistantId::from_raw("asst-1")),
    )
}

fn token(content: &str) -> FrameEvent {
    FrameEvent::Token { content: content.into() }
}

fn code_artifact(code: &str) -> Artifact {
    Artifact::with_first_version(
        "Snippet",
        ContentVersion {
            index: 1,
            title: "Snippet".into(),
            payload: ContentPayload::code("python", code),
        },
    )
}

fn author() -> Author {
    Author::new(UserId::from_raw("user-1"), "Ada")
}

// ── thread lifecycle ─────────────────────────────────────────────────────

#[tokio::test]
async fn search_or_create_creates_then_adopts_latest() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let first = h.manager.search_or_create(&h.user).await.unwrap();
    assert_eq!(h.manager.thread_id(), Some(&first));

    let second = h.manager.create_thread(&h.user).await.unwrap();
    assert_ne!(first, second);

    // a fresh manager over the same store picks up the newest thread
    let mut manager = SessionManager::new(
        h.store.clone(),
        h.transport.clone(),
        Arc::new(StaticIdentity::default()),
        SessionConfig::default(),
    );
    assert_eq!(manager.search_or_create(&h.user).await.unwrap(), second);
    assert_eq!(h.store.inner.list_for_user(&h.user).unwrap().len(), 2);
}

#[tokio::test]
async fn switch_restores_persisted_values() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let a = h.manager.create_thread(&h.user).await.unwrap();
    h.manager
        .create_version(ContentPayload::text("# Plan"), "Plan")
        .unwrap();
    assert!(!h.manager.is_artifact_saved());
    h.manager.persist().await.unwrap();
    assert!(h.manager.is_artifact_saved());

    let b = h.manager.create_thread(&h.user).await.unwrap();
    assert_eq!(h.manager.thread_id(), Some(&b));
    assert!(h.manager.artifact().is_none());
    assert!(h.manager.messages().is_empty());

    h.manager.switch(&a).await.unwrap();
    assert_eq!(h.manager.versions().unwrap().current_markdown(), Some("# Plan"));
    assert!(h.manager.is_artifact_saved());
}

#[tokio::test]
async fn failed_switch_leaves_state_untouched() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let a = h.manager.create_thread(&h.user).await.unwrap();
    let b = h.manager.create_thread(&h.user).await.unwrap();
    h.manager.create_version(ContentPayload::text("draft"), "Draft").unwrap();

    h.store.set_failing(true);
    let err = h.manager.switch(&a).await.unwrap_err();
    assert!(matches!(err, SessionError::Persistence(PersistenceError::Unavailable(_))));
    assert_eq!(h.manager.thread_id(), Some(&b));
    assert_eq!(h.manager.versions().unwrap().current_markdown(), Some("draft"));

    let err = h.manager.persist().await.unwrap_err();
    assert_eq!(err.error_kind(), "unavailable");
    assert!(!h.manager.is_artifact_saved());
}

#[tokio::test]
async fn switch_to_unknown_thread_is_not_found() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.create_thread(&h.user).await.unwrap();
    let err = h.manager.switch(&ThreadId::from_raw("missing")).await.unwrap_err();
    assert!(matches!(err, SessionError::Persistence(PersistenceError::NotFound(_))));
    assert!(h.manager.thread_id().is_some());
}

#[tokio::test]
async fn delete_active_selects_nothing() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let a = h.manager.create_thread(&h.user).await.unwrap();
    let b = h.manager.create_thread(&h.user).await.unwrap();

    assert!(!h.manager.delete(&a).await.unwrap());
    assert_eq!(h.manager.thread_id(), Some(&b));

    assert!(h.manager.delete(&b).await.unwrap());
    assert!(h.manager.thread_id().is_none());
    assert!(h.manager.messages().is_empty());
    assert!(matches!(
        h.manager.create_version(ContentPayload::text("x"), "x"),
        Err(SessionError::NoActiveThread)
    ));
}

#[tokio::test]
async fn prune_empty_is_idempotent_and_keeps_active() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let kept = h.manager.create_thread(&h.user).await.unwrap();
    h.manager.create_version(ContentPayload::text("keep me"), "Keep").unwrap();
    h.manager.persist().await.unwrap();

    let empty = h.manager.create_thread(&h.user).await.unwrap();
    let active = h.manager.create_thread(&h.user).await.unwrap();

    let removed = h.manager.prune_empty(&h.user).await.unwrap();
    assert_eq!(removed, vec![empty]);
    assert!(h.manager.prune_empty(&h.user).await.unwrap().is_empty());

    let remaining: Vec<ThreadId> = h
        .manager
        .list_threads(&h.user)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(remaining, vec![active.clone(), kept]);
    assert_eq!(h.manager.thread_id(), Some(&active));
}

// ── streaming ────────────────────────────────────────────────────────────

#[tokio::test]
async fn streamed_reply_and_artifact_land_in_active_thread() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let thread = h.manager.search_or_create(&h.user).await.unwrap();
    h.transport.push(MockResponse::events(&[
        token("Here "),
        token("it "),
        FrameEvent::Artifact { artifact: code_artifact("x = 1") },
        token("is"),
    ]));

    let pump = h.manager.send_message("write x").await.unwrap();
    assert!(h.manager.is_streaming());
    let outcome = h.manager.drive(pump).await.unwrap();

    let ChunkOutcome::Completed(summary) = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert_eq!((summary.tokens, summary.artifacts, summary.skipped), (3, 1, 0));
    assert!(!h.manager.is_streaming());
    assert!(!h.manager.first_token_received());
    assert_eq!(h.manager.stream_status(), StreamStatus::Completed);

    let messages = h.manager.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!((messages[0].role, messages[0].content.as_str()), (Role::User, "write x"));
    assert_eq!((messages[1].role, messages[1].content.as_str()), (Role::Assistant, "Here it is"));
    assert_eq!(h.manager.versions().unwrap().current_code(), Some(("python", "x = 1")));
    assert!(!h.manager.is_artifact_saved());

    let request = &h.transport.requests()[0];
    assert_eq!(request.thread_id, thread);
    assert_eq!(request.assistant_id, AssistantId::from_raw("asst-1"));
    assert_eq!(request.messages.len(), 1);
    assert_eq!(h.transport.open_streams(), 0);

    h.manager.persist().await.unwrap();
    let stored = h.store.inner.get(&thread).unwrap();
    assert_eq!(stored.values.unwrap().messages.len(), 2);
}

#[tokio::test]
async fn edits_interleave_with_stream_chunks() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    h.transport.push(MockResponse::events(&[
        FrameEvent::Artifact { artifact: code_artifact("x = 1") },
        token("done"),
    ]));

    let mut pump = h.manager.send_message("go").await.unwrap();
    let chunk = pump.next().await.unwrap();
    assert_eq!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Applied);
    assert!(!h.manager.first_token_received());

    h.manager
        .update_current(ContentPayload::code("python", "x = 10"))
        .unwrap();

    let chunk = pump.next().await.unwrap();
    assert_eq!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Applied);
    assert!(h.manager.first_token_received());
    assert_eq!(h.manager.versions().unwrap().current_code(), Some(("python", "x = 10")));

    let chunk = pump.next().await.unwrap();
    assert!(matches!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Completed(_)));
    assert!(pump.next().await.is_none());
}

#[tokio::test]
async fn switch_during_inflight_stream_abandons_it() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let a = h.manager.create_thread(&h.user).await.unwrap();
    h.manager.persist().await.unwrap();
    let b = h.manager.create_thread(&h.user).await.unwrap();
    h.manager.switch(&a).await.unwrap();

    h.transport.push(MockResponse::hanging(&[token("partial "), token("more")]));
    let mut pump = h.manager.send_message("hello").await.unwrap();
    let chunk = pump.next().await.unwrap();
    h.manager.apply_chunk(chunk).unwrap();
    assert!(h.manager.first_token_received());
    assert_eq!(h.transport.open_streams(), 1);

    h.manager.switch(&b).await.unwrap();
    assert!(!h.manager.is_streaming());
    assert!(!h.manager.first_token_received());
    assert!(h.manager.messages().is_empty());

    let chunk = pump.next().await.unwrap();
    assert_eq!(chunk.payload, ChunkPayload::Cancelled);
    assert_eq!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Ignored);
    assert!(pump.next().await.is_none());
    assert_eq!(h.transport.open_streams(), 0);
    assert!(h.manager.messages().is_empty());

    let stored = h.store.inner.get(&a).unwrap();
    assert_eq!(stored.values.unwrap_or_default(), ThreadValues::default());
}

#[tokio::test]
async fn reject_policy_refuses_second_stream() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    h.transport.push(MockResponse::hanging(&[token("a")]));
    let _pump = h.manager.send_message("one").await.unwrap();

    let err = h.manager.send_message("two").await.unwrap_err();
    assert!(matches!(err, SessionError::StreamInFlight));
    assert_eq!(h.transport.call_count(), 1);
    assert_eq!(h.manager.messages().len(), 1);
    assert!(h.manager.is_streaming());
}

#[tokio::test]
async fn replace_policy_cancels_and_keeps_partial_output() {
    let mut h = harness(ConcurrentStreamPolicy::Replace);
    h.manager.search_or_create(&h.user).await.unwrap();
    h.transport.push(MockResponse::hanging(&[token("first answer")]));
    h.transport.push(MockResponse::events(&[token("second answer")]));

    let mut first = h.manager.send_message("one").await.unwrap();
    let chunk = first.next().await.unwrap();
    h.manager.apply_chunk(chunk).unwrap();

    let second = h.manager.send_message("two").await.unwrap();
    let stale = first.next().await.unwrap();
    assert_eq!(h.manager.apply_chunk(stale).unwrap(), ChunkOutcome::Ignored);
    assert!(matches!(h.manager.drive(second).await.unwrap(), ChunkOutcome::Completed(_)));

    let contents: Vec<&str> = h.manager.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["one", "first answer", "two", "second answer"]);
    assert_eq!(h.transport.requests()[1].messages.len(), 3);
}

#[tokio::test]
async fn cancel_stream_keeps_partial_content() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    assert!(!h.manager.cancel_stream());

    h.transport.push(MockResponse::hanging(&[token("half")]));
    let mut pump = h.manager.send_message("go").await.unwrap();
    let chunk = pump.next().await.unwrap();
    h.manager.apply_chunk(chunk).unwrap();

    assert!(h.manager.cancel_stream());
    assert_eq!(h.manager.stream_status(), StreamStatus::Cancelled);
    assert_eq!(h.manager.messages()[1].content, "half");
    let chunk = pump.next().await.unwrap();
    assert_eq!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Ignored);
    assert_eq!(h.transport.open_streams(), 0);
}

#[tokio::test]
async fn remote_error_releases_the_transport() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    h.transport.push(MockResponse::hanging(&[
        token("partial"),
        FrameEvent::Error { message: "quota".into() },
    ]));

    let mut pump = h.manager.send_message("go").await.unwrap();
    let chunk = pump.next().await.unwrap();
    assert_eq!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Applied);
    let chunk = pump.next().await.unwrap();
    let err = h.manager.apply_chunk(chunk).unwrap_err();
    assert!(matches!(err, SessionError::Stream(StreamError::Remote(ref m)) if m == "quota"));
    assert_eq!(h.manager.stream_status(), StreamStatus::Failed);
    assert_eq!(h.manager.messages()[1].content, "partial");

    assert!(pump.cancel_token().is_cancelled());
    let chunk = tokio::time::timeout(std::time::Duration::from_millis(200), pump.next())
        .await
        .expect("pump should not block after a fatal error")
        .unwrap();
    assert_eq!(chunk.payload, ChunkPayload::Cancelled);
    assert_eq!(h.manager.apply_chunk(chunk).unwrap(), ChunkOutcome::Ignored);
    assert!(!pump.is_open());
    assert!(pump.next().await.is_none());
    assert_eq!(h.transport.open_streams(), 0);
}

#[tokio::test]
async fn open_failure_is_reported_before_first_token() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    h.transport
        .push(MockResponse::Error(TransportError::Network("connection refused".into())));

    let err = h.manager.send_message("hello").await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Stream(StreamError::Transport { phase: FailurePhase::BeforeFirstToken, .. })
    ));
    assert_eq!(h.manager.stream_status(), StreamStatus::Failed);
    assert_eq!(h.manager.messages().len(), 1);
    assert!(!h.manager.is_streaming());
}

#[tokio::test]
async fn streaming_requires_thread_and_identity() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    assert!(matches!(
        h.manager.send_message("hi").await,
        Err(SessionError::NoActiveThread)
    ));

    let mut anon = harness_with(
        ConcurrentStreamPolicy::Reject,
        StaticIdentity {
            user_id: Some(UserId::from_raw("user-1")),
            assistant_id: None,
        },
    );
    anon.manager.search_or_create(&anon.user).await.unwrap();
    assert!(matches!(
        anon.manager.send_message("hi").await,
        Err(SessionError::MissingIdentity("assistant"))
    ));
    assert_eq!(anon.transport.call_count(), 0);
    assert!(anon.manager.messages().is_empty());
}

// ── artifact and comments ────────────────────────────────────────────────

#[tokio::test]
async fn quick_start_and_version_navigation() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();

    let first = h
        .manager
        .quick_start(QuickStart::Code(ProgrammingLanguage::Python))
        .unwrap();
    assert_eq!(first.index, 1);
    assert!(matches!(
        h.manager.quick_start(QuickStart::Text),
        Err(SessionError::ArtifactExists)
    ));

    h.manager.update_current(ContentPayload::code("python", "x = 1")).unwrap();
    h.manager.create_version(ContentPayload::code("python", "x = 2"), "v2").unwrap();
    h.manager.create_version(ContentPayload::code("python", "x = 3"), "v3").unwrap();

    assert!(h.manager.navigate(Direction::Previous).unwrap());
    assert!(h.manager.navigate(Direction::Previous).unwrap());
    assert!(!h.manager.navigate(Direction::Previous).unwrap());
    assert_eq!(h.manager.versions().unwrap().current_code(), Some(("python", "x = 1")));

    h.manager.select_version(3).unwrap();
    assert!(!h.manager.navigate(Direction::Next).unwrap());
    assert!(matches!(h.manager.select_version(9), Err(SessionError::Version(_))));
    assert!(matches!(
        h.manager.update_current(ContentPayload::text("prose")),
        Err(SessionError::Version(_))
    ));
}

#[tokio::test]
async fn comment_threads_stay_with_the_live_session() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    let a = h.manager.create_thread(&h.user).await.unwrap();
    h.manager.create_version(ContentPayload::text("hello world"), "Doc").unwrap();
    h.manager.persist().await.unwrap();

    let tree = h.manager.render().unwrap();
    let node = tree.text_nodes(tree.root())[0];
    let selection = LiveSelection::new(DomPoint::new(node, 0), DomPoint::new(node, 5));
    h.manager.update_selection(&tree, tree.root(), &selection).unwrap();
    h.manager.add_comment(author(), "first").unwrap();
    h.manager.navigate(Direction::Previous).unwrap();
    assert_eq!(h.manager.annotations().unwrap().len(), 1);

    h.manager.create_thread(&h.user).await.unwrap();
    h.manager.switch(&a).await.unwrap();
    assert!(h.manager.annotations().unwrap().is_empty());
    assert_eq!(h.manager.versions().unwrap().current_markdown(), Some("hello world"));
}

#[tokio::test]
async fn comment_on_selection_and_detect_stale_anchor() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    h.manager.create_version(ContentPayload::text("hello world"), "Doc").unwrap();

    let tree = h.manager.render().unwrap();
    let words = tree.text_nodes(tree.root());
    let world = *words.last().unwrap();
    let selection = LiveSelection::new(DomPoint::new(world, 0), DomPoint::new(world, 5));
    let selected = h
        .manager
        .update_selection(&tree, tree.root(), &selection)
        .unwrap()
        .cloned()
        .unwrap();
    assert_eq!(selected.range, TextRange::new(6, 11).unwrap());
    assert_eq!(selected.text, "world");

    h.transport.push(MockResponse::events(&[token("ok")]));
    let pump = h.manager.send_message("make it louder").await.unwrap();
    h.manager.drive(pump).await.unwrap();
    let highlighted = h.transport.requests()[0].highlighted.clone().unwrap();
    assert_eq!(highlighted.text, "world");

    let thread_id = h.manager.add_comment(author(), "").unwrap();
    assert!(h.manager.selection().is_none());
    let annotations = h.manager.annotations().unwrap();
    assert_eq!(annotations.active_thread().map(|t| &t.id), Some(&thread_id));
    assert_eq!(h.manager.anchor_status(&thread_id).unwrap(), AnchorStatus::Intact);

    let reply = h.manager.reply(&thread_id, author(), "agreed").unwrap();
    h.manager
        .reply_to_comment(&thread_id, &reply.id, author(), "same")
        .unwrap();
    assert!(matches!(
        h.manager.reply(&thread_id, author(), "   "),
        Err(SessionError::Annotation(_))
    ));
    assert_eq!(h.manager.toggle_resolved(&thread_id).unwrap(), ThreadStatus::Resolved);
    assert_eq!(h.manager.toggle_resolved(&thread_id).unwrap(), ThreadStatus::Open);

    h.manager.update_current(ContentPayload::text("hello there")).unwrap();
    assert_eq!(
        h.manager.anchor_status(&thread_id).unwrap(),
        AnchorStatus::Stale { current_text: Some("there".into()) }
    );
    let thread = h.manager.annotations().unwrap().thread(&thread_id).unwrap();
    assert_eq!(thread.range, TextRange::new(6, 11).unwrap());
    assert_eq!(thread.comments.len(), 2);
}

#[tokio::test]
async fn stale_or_missing_selection_cannot_be_commented() {
    let mut h = harness(ConcurrentStreamPolicy::Reject);
    h.manager.search_or_create(&h.user).await.unwrap();
    assert!(matches!(h.manager.add_comment(author(), "x"), Err(SessionError::NoSelection)));

    h.manager.create_version(ContentPayload::text("hello world"), "Doc").unwrap();
    let tree = h.manager.render().unwrap();
    let words = tree.text_nodes(tree.root());
    let hello = words[0];

    let collapsed = LiveSelection::new(DomPoint::new(hello, 2), DomPoint::new(hello, 2));
    assert!(h.manager.update_selection(&tree, tree.root(), &collapsed).unwrap().is_none());

    let selection = LiveSelection::new(DomPoint::new(hello, 0), DomPoint::new(hello, 5));
    assert!(h.manager.update_selection(&tree, tree.root(), &selection).unwrap().is_some());
    h.manager.update_current(ContentPayload::text("jello world")).unwrap();
    assert!(matches!(h.manager.add_comment(author(), "x"), Err(SessionError::StaleSelection)));
    assert!(h.manager.selection().is_none());

    // the old projection no longer matches the content
    assert!(matches!(
        h.manager.update_selection(&tree, tree.root(), &selection),
        Err(SessionError::StaleSelection)
    ));
}
