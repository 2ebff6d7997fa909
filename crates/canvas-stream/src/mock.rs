use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use canvas_core::errors::TransportError;
use canvas_core::stream::FrameEvent;
use canvas_core::transport::{ChunkStream, StreamRequest, StreamTransport};

#[derive(Clone, Debug)]
pub enum MockChunk {
    Data(Bytes),
    Error(TransportError),
    Delay(Duration),
}

/// Scripted reply to one `open_stream` call.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Yield the chunks, then end.
    Chunks(Vec<MockChunk>),
    /// Yield the chunks, then stay open until dropped.
    Hang(Vec<MockChunk>),
    /// Fail `open_stream` itself.
    Error(TransportError),
}

impl MockResponse {
    /// One chunk per event, newline-delimited.
    pub fn events(events: &[FrameEvent]) -> Self {
        Self::Chunks(events.iter().map(encode).collect())
    }

    /// Like [`events`](Self::events) but never closes.
    pub fn hanging(events: &[FrameEvent]) -> Self {
        Self::Hang(events.iter().map(encode).collect())
    }

    /// Raw wire text cut into `size`-byte chunks, ignoring frame boundaries.
    pub fn split(raw: &str, size: usize) -> Self {
        let size = size.max(1);
        Self::Chunks(
            raw.as_bytes()
                .chunks(size)
                .map(|c| MockChunk::Data(Bytes::copy_from_slice(c)))
                .collect(),
        )
    }
}

fn encode(event: &FrameEvent) -> MockChunk {
    let mut line = serde_json::to_vec(event).unwrap_or_default();
    line.push(b'\n');
    MockChunk::Data(Bytes::from(line))
}

/// Decrements the open-stream count when the stream is dropped.
struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Script {
    chunks: VecDeque<MockChunk>,
    hang: bool,
    _guard: OpenGuard,
}

/// Transport that replays scripted responses in call order.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<StreamRequest>>,
    open: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            open: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn push(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }

    /// Streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ChunkStream, TransportError> {
        self.requests.lock().push(request.clone());
        let response = self.responses.lock().pop_front().ok_or_else(|| {
            TransportError::InvalidRequest("MockTransport: no response configured".into())
        })?;

        let (chunks, hang) = match response {
            MockResponse::Chunks(chunks) => (chunks, false),
            MockResponse::Hang(chunks) => (chunks, true),
            MockResponse::Error(e) => return Err(e),
        };
        self.open.fetch_add(1, Ordering::SeqCst);
        let script = Script {
            chunks: chunks.into(),
            hang,
            _guard: OpenGuard(Arc::clone(&self.open)),
        };

        let stream = futures::stream::unfold(script, |mut script| async move {
            loop {
                match script.chunks.pop_front() {
                    Some(MockChunk::Data(bytes)) => return Some((Ok(bytes), script)),
                    Some(MockChunk::Error(e)) => return Some((Err(e), script)),
                    Some(MockChunk::Delay(d)) => tokio::time::sleep(d).await,
                    None if script.hang => std::future::pending::<()>().await,
                    None => return None,
                }
            }
        });
        Ok(Box::pin(stream))
    }
}
