use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{ClientError, TransportError};

/// Longest error body, in characters, kept from a non-2xx response.
const STATUS_BODY_LIMIT: usize = 512;

/// Body stream of an open research request.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Request body for the streaming research endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// Repository identifier, for example `owner/name`.
    pub repo_name: String,
    /// Natural-language question about the repository.
    pub query: String,
}

impl ResearchRequest {
    pub fn new(repo_name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            query: query.into(),
        }
    }

    /// Returns a trimmed copy, or a validation error if either field is blank.
    pub fn validated(&self) -> Result<Self, ClientError> {
        let repo_name = self.repo_name.trim();
        if repo_name.is_empty() {
            return Err(ClientError::Validation("repository must not be empty".into()));
        }
        let query = self.query.trim();
        if query.is_empty() {
            return Err(ClientError::Validation("query must not be empty".into()));
        }
        Ok(Self::new(repo_name, query))
    }
}

/// Opens the research event stream.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    /// Sends the request and returns the response body as a chunk stream.
    async fn open(&self, request: &ResearchRequest) -> Result<ByteStream, TransportError>;
}

/// `StreamTransport` that POSTs to the research endpoint with reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    url: url::Url,
}

impl ReqwestTransport {
    /// Builds a client with a connect timeout only; an open stream may run
    /// for as long as the agent keeps producing events.
    pub fn new(url: url::Url, connect_timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build stream client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait::async_trait]
impl StreamTransport for ReqwestTransport {
    async fn open(&self, request: &ResearchRequest) -> Result<ByteStream, TransportError> {
        debug!(
            repo = %request.repo_name,
            host = self.url.host_str().unwrap_or("unknown"),
            "opening research stream"
        );
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(TransportError::from)?;
        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => truncate_body(&body),
                Err(_) => "<unreadable body>".to_string(),
            };
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|e| match TransportError::from(e) {
                TransportError::Request { message } => TransportError::Read { message },
                other => other,
            })
        });
        Ok(Box::pin(stream))
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(STATUS_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
