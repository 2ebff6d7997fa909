pub mod consumer;
pub mod error;
pub mod frame;
pub mod http;
pub mod mock;
pub mod pump;

pub use consumer::{StreamConsumer, StreamStatus, StreamSummary, StreamTarget};
pub use error::{DecodeError, FailurePhase, StreamError};
pub use frame::{Decoded, FrameDecoder, DEFAULT_MAX_BUFFER};
pub use http::HttpTransport;
pub use mock::{MockChunk, MockResponse, MockTransport};
pub use pump::{ChunkPayload, StreamChunk, StreamPump};
