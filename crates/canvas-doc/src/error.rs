use canvas_core::artifact::{ArtifactViolation, ContentKind};
use canvas_core::ids::{CommentId, CommentThreadId};
use canvas_core::range::TextRange;

/// Errors from [`AnnotationStore`](crate::AnnotationStore). The store is
/// unchanged whenever one is returned.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AnnotationError {
    #[error("invalid range {}..{}: {reason}", range.start, range.end)]
    InvalidRange { range: TextRange, reason: &'static str },
    #[error("comment thread not found: {0}")]
    ThreadNotFound(CommentThreadId),
    #[error("comment not found: {0}")]
    CommentNotFound(CommentId),
    #[error("comment content is empty")]
    EmptyContent,
}

/// Errors from [`ArtifactVersionStore`](crate::ArtifactVersionStore).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    #[error("version {0} not found")]
    VersionNotFound(u32),
    #[error("type mismatch: current version is {expected}, got {found}")]
    TypeMismatch { expected: ContentKind, found: ContentKind },
    #[error("no artifact")]
    NoArtifact,
    #[error("version index space exhausted")]
    IndexExhausted,
    #[error("invalid artifact snapshot: {0}")]
    InvalidSnapshot(#[from] ArtifactViolation),
}
