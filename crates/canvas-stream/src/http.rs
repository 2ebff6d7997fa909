use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use tracing::instrument;

use canvas_core::errors::TransportError;
use canvas_core::transport::{ChunkStream, StreamRequest, StreamTransport};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// POSTs the request as JSON and hands back the raw response body.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, chat_path: &str) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: join_url(base_url, chat_path),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[async_trait]
impl StreamTransport for HttpTransport {
    #[instrument(skip(self, request), fields(thread_id = %request.thread_id, endpoint = %self.endpoint))]
    async fn open_stream(&self, request: &StreamRequest) -> Result<ChunkStream, TransportError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(TransportError::from_status(status, body));
        }

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Interrupted(e.to_string())));
        Ok(Box::pin(stream))
    }
}
