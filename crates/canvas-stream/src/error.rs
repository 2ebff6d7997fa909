use std::fmt;

use canvas_core::artifact::ArtifactViolation;
use canvas_core::errors::TransportError;

/// Problems turning buffered bytes into frame events.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    // Recoverable: the unit is skipped and decoding continues
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("unrecognized frame type: {0}")]
    Unrecognized(String),
    #[error("artifact frame rejected: {0}")]
    InvalidArtifact(ArtifactViolation),

    // Fatal to the stream
    #[error("frame buffer exceeded {limit} bytes")]
    Overflow { limit: usize },
    #[error("stream ended with {pending} undecoded bytes")]
    Truncated { pending: usize },
}

impl DecodeError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Overflow { .. } | Self::Truncated { .. })
    }
}

/// How far a stream got before its transport failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePhase {
    BeforeFirstToken,
    AfterPartialContent,
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeFirstToken => f.write_str("before first token"),
            Self::AfterPartialContent => f.write_str("after partial content"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("transport failed {phase}: {source}")]
    Transport {
        phase: FailurePhase,
        #[source]
        source: TransportError,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("a stream is already in progress")]
    AlreadyStreaming,
    #[error("no stream in progress")]
    NotStreaming,
}

impl StreamError {
    /// Partial content was received before the stream died.
    pub fn had_partial_content(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                phase: FailurePhase::AfterPartialContent,
                ..
            }
        )
    }
}
