use chrono::Utc;
use tracing::debug;

use canvas_core::comments::{Author, Comment, CommentThread, ThreadStatus};
use canvas_core::ids::{CommentId, CommentThreadId};
use canvas_core::range::TextRange;

use crate::error::AnnotationError;

/// Whether a thread's anchor still covers the text it was opened on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnchorStatus {
    Intact,
    /// The range now covers `current_text`, or nothing if it no longer fits.
    Stale { current_text: Option<String> },
}

impl AnchorStatus {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact)
    }
}

/// Comment threads anchored to ranges of one document.
///
/// Ranges are stored as given and never recomputed. Use [`anchor_status`]
/// to find out whether edits have moved the text underneath them.
///
/// [`anchor_status`]: AnnotationStore::anchor_status
#[derive(Clone, Debug, Default)]
pub struct AnnotationStore {
    threads: Vec<CommentThread>,
    active: Option<CommentThreadId>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a thread over `range` of `canonical`, seeded with `initial`.
    /// The initial comment may be blank.
    pub fn open_thread(
        &mut self,
        canonical: &str,
        range: TextRange,
        anchor_text: &str,
        author: Author,
        initial: &str,
    ) -> Result<&CommentThread, AnnotationError> {
        if range.start >= range.end {
            return Err(AnnotationError::InvalidRange { range, reason: "collapsed" });
        }
        let Some(slice) = range.slice(canonical) else {
            return Err(AnnotationError::InvalidRange { range, reason: "out of bounds" });
        };
        if slice != anchor_text {
            return Err(AnnotationError::InvalidRange { range, reason: "anchor text mismatch" });
        }

        let thread = CommentThread {
            id: CommentThreadId::new(),
            range,
            anchor_text: anchor_text.to_owned(),
            comments: vec![Comment::new(author, initial)],
            status: ThreadStatus::Open,
            created_at: Utc::now(),
        };
        debug!(thread_id = %thread.id, start = range.start, end = range.end, "comment thread opened");
        self.threads.push(thread);
        Ok(&self.threads[self.threads.len() - 1])
    }

    pub fn reply(
        &mut self,
        thread_id: &CommentThreadId,
        author: Author,
        content: &str,
    ) -> Result<Comment, AnnotationError> {
        if content.trim().is_empty() {
            return Err(AnnotationError::EmptyContent);
        }
        let thread = self.thread_mut(thread_id)?;
        let comment = Comment::new(author, content);
        thread.comments.push(comment.clone());
        Ok(comment)
    }

    /// Reply to a specific comment rather than to the thread.
    pub fn reply_to_comment(
        &mut self,
        thread_id: &CommentThreadId,
        comment_id: &CommentId,
        author: Author,
        content: &str,
    ) -> Result<Comment, AnnotationError> {
        if content.trim().is_empty() {
            return Err(AnnotationError::EmptyContent);
        }
        let thread = self.thread_mut(thread_id)?;
        let parent = thread
            .find_comment_mut(comment_id)
            .ok_or_else(|| AnnotationError::CommentNotFound(comment_id.clone()))?;
        let comment = Comment::new(author, content);
        parent.replies.push(comment.clone());
        Ok(comment)
    }

    /// Flip Open and Resolved. Returns the new status.
    pub fn toggle_resolved(&mut self, thread_id: &CommentThreadId) -> Result<ThreadStatus, AnnotationError> {
        let thread = self.thread_mut(thread_id)?;
        thread.status = thread.status.toggled();
        Ok(thread.status)
    }

    /// Make `thread_id` the active thread, or clear it with `None`.
    pub fn set_active(&mut self, thread_id: Option<&CommentThreadId>) -> Result<(), AnnotationError> {
        if let Some(id) = thread_id {
            self.thread(id)
                .ok_or_else(|| AnnotationError::ThreadNotFound(id.clone()))?;
        }
        self.active = thread_id.cloned();
        Ok(())
    }

    pub fn active_thread(&self) -> Option<&CommentThread> {
        self.active.as_ref().and_then(|id| self.thread(id))
    }

    pub fn thread(&self, thread_id: &CommentThreadId) -> Option<&CommentThread> {
        self.threads.iter().find(|t| &t.id == thread_id)
    }

    fn thread_mut(&mut self, thread_id: &CommentThreadId) -> Result<&mut CommentThread, AnnotationError> {
        self.threads
            .iter_mut()
            .find(|t| &t.id == thread_id)
            .ok_or_else(|| AnnotationError::ThreadNotFound(thread_id.clone()))
    }

    /// Threads in creation order.
    pub fn threads(&self) -> &[CommentThread] {
        &self.threads
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Compare a thread's stored anchor text with what its range covers now.
    pub fn anchor_status(
        &self,
        thread_id: &CommentThreadId,
        canonical: &str,
    ) -> Result<AnchorStatus, AnnotationError> {
        let thread = self
            .thread(thread_id)
            .ok_or_else(|| AnnotationError::ThreadNotFound(thread_id.clone()))?;
        Ok(match thread.range.slice(canonical) {
            Some(current) if current == thread.anchor_text => AnchorStatus::Intact,
            current => AnchorStatus::Stale {
                current_text: current.map(str::to_owned),
            },
        })
    }

    /// Delete a thread on explicit user request.
    pub fn remove_thread(&mut self, thread_id: &CommentThreadId) -> Result<CommentThread, AnnotationError> {
        let pos = self
            .threads
            .iter()
            .position(|t| &t.id == thread_id)
            .ok_or_else(|| AnnotationError::ThreadNotFound(thread_id.clone()))?;
        if self.active.as_ref() == Some(thread_id) {
            self.active = None;
        }
        Ok(self.threads.remove(pos))
    }

    pub fn clear(&mut self) {
        self.threads.clear();
        self.active = None;
    }
}
