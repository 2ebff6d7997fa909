use bytes::Bytes;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use canvas_core::errors::TransportError;
use canvas_core::ids::ThreadId;
use canvas_core::transport::ChunkStream;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChunkPayload {
    Data(Bytes),
    Failed(TransportError),
    Closed,
    Cancelled,
}

impl ChunkPayload {
    /// True once the pump has nothing more to deliver.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Data(_))
    }
}

/// A chunk tagged with the stream it came from, so the receiver can ignore
/// chunks from a stream it has since abandoned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamChunk {
    pub generation: u64,
    pub thread_id: ThreadId,
    pub payload: ChunkPayload,
}

/// Owns the transport handle of exactly one stream.
///
/// The handle is dropped as soon as the stream closes, fails or is cancelled.
pub struct StreamPump {
    generation: u64,
    thread_id: ThreadId,
    inner: Option<ChunkStream>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for StreamPump {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPump")
            .field("generation", &self.generation)
            .field("thread_id", &self.thread_id)
            .field("open", &self.inner.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl StreamPump {
    pub fn new(generation: u64, thread_id: ThreadId, inner: ChunkStream, cancel: CancellationToken) -> Self {
        Self {
            generation,
            thread_id,
            inner: Some(inner),
            cancel,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    pub fn is_open(&self) -> bool {
        self.inner.is_some()
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for the next chunk. Cancellation is checked before each read.
    /// Returns `None` after a terminal payload has been delivered.
    pub async fn next(&mut self) -> Option<StreamChunk> {
        let inner = self.inner.as_mut()?;
        let payload = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => ChunkPayload::Cancelled,
            item = inner.next() => match item {
                Some(Ok(bytes)) => ChunkPayload::Data(bytes),
                Some(Err(e)) => ChunkPayload::Failed(e),
                None => ChunkPayload::Closed,
            },
        };
        if payload.is_terminal() {
            self.inner = None;
            debug!(generation = self.generation, "transport released");
        }
        Some(StreamChunk {
            generation: self.generation,
            thread_id: self.thread_id.clone(),
            payload,
        })
    }
}
