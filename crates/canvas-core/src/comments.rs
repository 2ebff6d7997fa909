use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, CommentThreadId, UserId};
use crate::range::TextRange;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Author {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            avatar: None,
        }
    }
}

/// A comment and its nested replies.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub author: Author,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<Comment>,
}

impl Comment {
    pub fn new(author: Author, content: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            author,
            content: content.into(),
            created_at: Utc::now(),
            replies: Vec::new(),
        }
    }

    /// Depth-first search through this comment and its replies.
    pub fn find_mut(&mut self, id: &CommentId) -> Option<&mut Comment> {
        if &self.id == id {
            return Some(self);
        }
        self.replies.iter_mut().find_map(|r| r.find_mut(id))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    #[default]
    Open,
    Resolved,
}

impl ThreadStatus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Resolved,
            Self::Resolved => Self::Open,
        }
    }
}

/// Comments anchored to one range of the canonical text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub id: CommentThreadId,
    pub range: TextRange,
    /// The canonical slice the range covered when the thread was opened.
    pub anchor_text: String,
    pub comments: Vec<Comment>,
    pub status: ThreadStatus,
    pub created_at: DateTime<Utc>,
}

impl CommentThread {
    pub fn is_resolved(&self) -> bool {
        self.status == ThreadStatus::Resolved
    }

    pub fn find_comment_mut(&mut self, id: &CommentId) -> Option<&mut Comment> {
        self.comments.iter_mut().find_map(|c| c.find_mut(id))
    }
}
