use canvas_core::ids::ThreadId;
use canvas_core::messages::Message;
use canvas_core::persistence::{Thread, ThreadValues};
use canvas_doc::{AnnotationStore, ArtifactVersionStore, VersionError};
use canvas_stream::{StreamConsumer, StreamTarget};

use crate::selection::SelectionState;

/// In-memory state of the active thread.
#[derive(Debug)]
pub struct LiveSession {
    pub(crate) thread_id: ThreadId,
    pub(crate) messages: Vec<Message>,
    pub(crate) versions: ArtifactVersionStore,
    pub(crate) annotations: AnnotationStore,
    pub(crate) selection: SelectionState,
    pub(crate) consumer: StreamConsumer,
}

impl LiveSession {
    /// Restore from a persisted thread. Fails without side effects if the
    /// stored artifact is invalid.
    pub(crate) fn load(thread: Thread, max_buffer: usize) -> Result<Self, VersionError> {
        let values = thread.values.unwrap_or_default();
        let mut versions = ArtifactVersionStore::new();
        versions.seed(values.artifact)?;
        Ok(Self {
            thread_id: thread.id,
            messages: values.messages,
            versions,
            annotations: AnnotationStore::new(),
            selection: SelectionState::default(),
            consumer: StreamConsumer::new(max_buffer),
        })
    }

    pub(crate) fn snapshot(&self) -> ThreadValues {
        ThreadValues {
            messages: self.messages.clone(),
            artifact: self.versions.artifact().cloned(),
        }
    }

    pub(crate) fn target(&mut self) -> (&mut StreamConsumer, StreamTarget<'_>) {
        (
            &mut self.consumer,
            StreamTarget {
                messages: &mut self.messages,
                versions: &mut self.versions,
            },
        )
    }

    /// Canonical text and index of the current version.
    pub(crate) fn current_text(&self) -> Option<(&str, u32)> {
        self.versions
            .current()
            .map(|v| (v.canonical_text(), v.index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_core::artifact::{Artifact, ContentPayload, ContentVersion};
    use canvas_core::ids::UserId;

    fn thread() -> Thread {
        Thread {
            id: ThreadId::from_raw("thread-1"),
            user_id: UserId::from_raw("user-1"),
            created_at: Default::default(),
            values: None,
        }
    }

    #[test]
    fn load_empty_thread() {
        let live = LiveSession::load(thread(), 1024).unwrap();
        assert!(live.messages.is_empty());
        assert!(live.versions.artifact().is_none());
        assert!(live.current_text().is_none());
        assert_eq!(live.snapshot(), ThreadValues::default());
    }

    #[test]
    fn load_restores_values_as_saved() {
        let mut thread = thread();
        thread.user_id = UserId::from_raw("user-2");
        let version = ContentVersion {
            index: 1,
            title: "notes".into(),
            payload: ContentPayload::text("# hi"),
        };
        thread.values = Some(ThreadValues {
            messages: vec![Message::user("hello")],
            artifact: Some(Artifact::with_first_version("notes", version)),
        });
        let live = LiveSession::load(thread.clone(), 1024).unwrap();
        assert!(live.versions.is_saved());
        assert_eq!(live.current_text(), Some(("# hi", 1)));
        assert_eq!(Some(live.snapshot()), thread.values);
    }

    #[test]
    fn load_rejects_invalid_artifact() {
        let mut thread = thread();
        let version = ContentVersion {
            index: 1,
            title: String::new(),
            payload: ContentPayload::text(""),
        };
        let mut artifact = Artifact::with_first_version("broken", version);
        artifact.current_index = 9;
        thread.values = Some(ThreadValues { messages: Vec::new(), artifact: Some(artifact) });
        assert!(LiveSession::load(thread, 1024).is_err());
    }
}
