use std::time::Duration;

use async_trait::async_trait;
use http::header;
use tracing::{debug, error};

use crate::clients::transport::{ChatTransport, TransportFailure, TransportReply};

use super::types::ChatRequest;

/// reqwest-backed transport for OpenAI-compatible chat-completion endpoints.
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        HttpTransport {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

fn retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|secs| *secs >= 0.0)
        .map(|secs| secs.ceil() as u64)
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(
        &self,
        credential: &str,
        request: &ChatRequest,
    ) -> Result<TransportReply, TransportFailure> {
        debug!(
            "Sending request to LLM API: {} - {} ({} messages)",
            request.model,
            self.url,
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.url)
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", credential))
            .json(request)
            .send()
            .await;

        let response = match response {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                error!("Request to LLM API timed out");
                return Err(TransportFailure::Timeout);
            }
            Err(e) => {
                error!("Error sending request to LLM API: {}", e);
                return Err(TransportFailure::Network(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let retry_after = retry_after(response.headers());
        let body = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() => return Err(TransportFailure::Timeout),
            Err(e) => {
                error!("Error reading response text: {}", e);
                return Err(TransportFailure::Network(format!(
                    "Failed to read response text: {}",
                    e
                )));
            }
        };

        Ok(TransportReply {
            status,
            body,
            retry_after,
        })
    }
}
