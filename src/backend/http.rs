//! HTTP implementation of the chat backend

use super::types::{ChatReply, ChatRequest, HealthStatus};
use super::{BackendError, ChatBackend};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Chat backend reached over HTTP
pub struct HttpChatBackend {
    client: Client,
    chat_url: String,
    health_url: String,
}

impl HttpChatBackend {
    /// `timeout` of `None` leaves requests unbounded; the server's own
    /// timeout, if any, surfaces as a failure.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let base = base_url.trim_end_matches('/');

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::unknown(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            chat_url: format!("{base}/chat"),
            health_url: format!("{base}/health"),
        })
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
        let status = response.status();
        let body = checked_body(status, response.text().await)?;

        serde_json::from_str(&body)
            .map_err(|e| BackendError::decode(format!("Failed to parse response: {e} - body: {body}")))
    }
}

/// Body of a successful response, or the error it stands for. A failed
/// status is reported as such even when its body could not be read.
fn checked_body<E: std::fmt::Display>(
    status: StatusCode,
    body: Result<String, E>,
) -> Result<String, BackendError> {
    match body {
        Ok(body) if status.is_success() => Ok(body),
        Ok(body) => Err(BackendError::status(status, &body)),
        Err(e) if status.is_success() => Err(BackendError::network(format!(
            "Failed to read response: {e}"
        ))),
        Err(e) => {
            tracing::warn!(status = %status, error = %e, "Failed to read error response body");
            Err(BackendError::status(status, ""))
        }
    }
}

fn transport_error(e: &reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::network(format!("Request timeout: {e}"))
    } else if e.is_connect() {
        BackendError::network(format!("Connection failed: {e}"))
    } else {
        BackendError::network(format!("Request failed: {e}"))
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        let response = self
            .client
            .post(&self.chat_url)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::read_json(response).await
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        Self::read_json(response).await
    }

    fn endpoint(&self) -> &str {
        &self.chat_url
    }
}
