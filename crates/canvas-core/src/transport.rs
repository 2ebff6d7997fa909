use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::errors::TransportError;
use crate::ids::{AssistantId, ThreadId, UserId};
use crate::messages::Message;
use crate::range::TextRange;

/// The user's current text selection, forwarded so the remote side can
/// scope an edit to it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightedText {
    pub range: TextRange,
    pub text: String,
}

/// Body of one streaming request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    pub thread_id: ThreadId,
    pub assistant_id: AssistantId,
    pub user_id: UserId,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted: Option<HighlightedText>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

/// Raw response bytes. Chunk boundaries carry no meaning.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send>>;

/// Opens a byte stream for a request. Implemented over HTTP in production
/// and by a scripted mock in tests.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open_stream(&self, request: &StreamRequest) -> Result<ChunkStream, TransportError>;
}
