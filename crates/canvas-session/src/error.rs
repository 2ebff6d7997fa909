use thiserror::Error;

use canvas_core::errors::PersistenceError;
use canvas_doc::{AnnotationError, VersionError};
use canvas_stream::StreamError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("persistence: {0}")]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Annotation(#[from] AnnotationError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("no active thread")]
    NoActiveThread,

    #[error("missing {0} identity")]
    MissingIdentity(&'static str),

    #[error("a response is already streaming on this thread")]
    StreamInFlight,

    #[error("nothing is selected")]
    NoSelection,

    #[error("selection no longer matches the current content")]
    StaleSelection,

    #[error("thread already has an artifact")]
    ArtifactExists,
}

impl SessionError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Persistence(e) => e.error_kind(),
            Self::Annotation(_) => "annotation",
            Self::Version(_) => "version",
            Self::Stream(_) => "stream",
            Self::NoActiveThread => "no_active_thread",
            Self::MissingIdentity(_) => "missing_identity",
            Self::StreamInFlight => "stream_in_flight",
            Self::NoSelection | Self::StaleSelection => "selection",
            Self::ArtifactExists => "artifact_exists",
        }
    }
}
