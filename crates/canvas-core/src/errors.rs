/// Failures raised by a [`StreamTransport`](crate::transport::StreamTransport)
/// while opening or reading a response stream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("server responded {status}: {body}")]
    Status { status: u16, body: String },
    #[error("stream interrupted: {0}")]
    Interrupted(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("timed out")]
    Timeout,
}

impl TransportError {
    /// Map a non-success HTTP status onto an error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 | 422 => Self::InvalidRequest(body),
            408 | 504 => Self::Timeout,
            _ => Self::Status { status, body },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Interrupted(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidRequest(_) => false,
        }
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Interrupted(_) => "interrupted",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Timeout => "timeout",
        }
    }
}

/// Failures surfaced by a [`ThreadStore`](crate::persistence::ThreadStore).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PersistenceError {
    #[error("thread not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt record: {0}")]
    Corrupt(String),
    #[error("store error: {0}")]
    Backend(String),
}

impl PersistenceError {
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unavailable(_) => "unavailable",
            Self::Corrupt(_) => "corrupt",
            Self::Backend(_) => "backend",
        }
    }
}
