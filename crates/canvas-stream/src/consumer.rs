//! State machine applying one response stream to a thread's live state.

use tracing::{debug, info, warn};

use canvas_core::errors::TransportError;
use canvas_core::ids::MessageId;
use canvas_core::messages::Message;
use canvas_core::stream::FrameEvent;
use canvas_doc::versions::ArtifactVersionStore;

use crate::error::{FailurePhase, StreamError};
use crate::frame::{Decoded, FrameDecoder, DEFAULT_MAX_BUFFER};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamStatus {
    #[default]
    Idle,
    Streaming,
    Completed,
    Failed,
    Cancelled,
}

/// The live state a stream writes into. Borrowed per chunk so edits made
/// between chunks are seen by the next one.
pub struct StreamTarget<'a> {
    pub messages: &'a mut Vec<Message>,
    pub versions: &'a mut ArtifactVersionStore,
}

/// Counters for one finished stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub tokens: usize,
    pub artifacts: usize,
    pub skipped: usize,
}

#[derive(Debug)]
pub struct StreamConsumer {
    status: StreamStatus,
    first_token_received: bool,
    decoder: FrameDecoder,
    live_message: Option<MessageId>,
    summary: StreamSummary,
}

impl Default for StreamConsumer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER)
    }
}

impl StreamConsumer {
    pub fn new(max_buffer: usize) -> Self {
        Self {
            status: StreamStatus::Idle,
            first_token_received: false,
            decoder: FrameDecoder::new(max_buffer),
            live_message: None,
            summary: StreamSummary::default(),
        }
    }

    pub fn status(&self) -> StreamStatus {
        self.status
    }

    pub fn is_streaming(&self) -> bool {
        self.status == StreamStatus::Streaming
    }

    pub fn first_token_received(&self) -> bool {
        self.first_token_received
    }

    pub fn summary(&self) -> StreamSummary {
        self.summary
    }

    /// Enter `Streaming`. Only one stream at a time.
    pub fn begin(&mut self) -> Result<(), StreamError> {
        if self.is_streaming() {
            return Err(StreamError::AlreadyStreaming);
        }
        self.decoder.reset();
        self.first_token_received = false;
        self.live_message = None;
        self.summary = StreamSummary::default();
        self.status = StreamStatus::Streaming;
        debug!("stream started");
        Ok(())
    }

    /// Feed one transport chunk. Events apply in decode order.
    pub fn ingest(&mut self, chunk: &[u8], target: StreamTarget<'_>) -> Result<(), StreamError> {
        if !self.is_streaming() {
            return Err(StreamError::NotStreaming);
        }
        let decoded = match self.decoder.push(chunk) {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(error = %e, "stream decode failed");
                self.finish(StreamStatus::Failed);
                return Err(e.into());
            }
        };

        for unit in decoded {
            match unit {
                Decoded::Event(FrameEvent::Token { content }) => {
                    self.apply_token(&content, target.messages);
                }
                Decoded::Event(FrameEvent::Artifact { artifact }) => {
                    match target.versions.replace(artifact) {
                        Ok(()) => self.summary.artifacts += 1,
                        Err(e) => {
                            self.summary.skipped += 1;
                            warn!(error = %e, "skipping artifact frame");
                        }
                    }
                }
                Decoded::Event(FrameEvent::Error { message }) => {
                    warn!(%message, "remote reported stream error");
                    self.finish(StreamStatus::Failed);
                    return Err(StreamError::Remote(message));
                }
                Decoded::Skipped(e) => {
                    self.summary.skipped += 1;
                    warn!(error = %e, "skipping undecodable frame");
                }
            }
        }
        Ok(())
    }

    fn apply_token(&mut self, content: &str, messages: &mut Vec<Message>) {
        if !self.first_token_received {
            self.first_token_received = true;
            debug!("first token received");
        }
        self.summary.tokens += 1;

        let live = self
            .live_message
            .as_ref()
            .and_then(|id| messages.iter().rposition(|m| &m.id == id));
        match live {
            Some(pos) => messages[pos].content.push_str(content),
            None => {
                let message = Message::assistant(content);
                self.live_message = Some(message.id.clone());
                messages.push(message);
            }
        }
    }

    /// Transport reported end of stream.
    pub fn complete(&mut self) -> Result<StreamSummary, StreamError> {
        if !self.is_streaming() {
            return Err(StreamError::NotStreaming);
        }
        if let Err(e) = self.decoder.finish() {
            warn!(error = %e, "stream ended mid-frame");
            self.finish(StreamStatus::Failed);
            return Err(StreamError::Decode(e));
        }
        let summary = self.summary;
        self.finish(StreamStatus::Completed);
        info!(
            tokens = summary.tokens,
            artifacts = summary.artifacts,
            skipped = summary.skipped,
            "stream completed"
        );
        Ok(summary)
    }

    /// Transport failed. Content received so far stays in the message log.
    pub fn fail(&mut self, error: TransportError) -> StreamError {
        let phase = if self.first_token_received {
            FailurePhase::AfterPartialContent
        } else {
            FailurePhase::BeforeFirstToken
        };
        warn!(error = %error, kind = error.error_kind(), %phase, "stream transport failed");
        if self.is_streaming() {
            self.finish(StreamStatus::Failed);
        }
        StreamError::Transport { phase, source: error }
    }

    /// Stop consuming. Safe from any state; returns whether a stream was
    /// actually cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.is_streaming() {
            return false;
        }
        self.finish(StreamStatus::Cancelled);
        info!("stream cancelled");
        true
    }

    /// Back to `Idle`, discarding any buffered bytes.
    pub fn reset(&mut self) {
        self.finish(StreamStatus::Idle);
        self.summary = StreamSummary::default();
    }

    fn finish(&mut self, status: StreamStatus) {
        self.status = status;
        self.first_token_received = false;
        self.live_message = None;
        self.decoder.reset();
    }
}
