use async_trait::async_trait;

use super::openai::types::ChatRequest;

/// Raw HTTP outcome of one attempt. Status interpretation is left to the
/// completion client.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
    /// Parsed `Retry-After` header, in seconds.
    pub retry_after: Option<u64>,
}

impl TransportReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        TransportReply {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportFailure {
    Timeout,
    Network(String),
}

/// Sends one chat-completion request to the remote service.
///
/// Implementors own transport and serialization only; retries, rate
/// limiting and status handling live in
/// [`super::completion::CompletionClient`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportReply, TransportFailure>;
}
