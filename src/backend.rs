//! Chat backend abstraction
//!
//! The reasoning backend is opaque: one chat call and one health probe.

mod error;
mod http;
mod types;

pub use error::BackendError;
pub use http::HttpChatBackend;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for chat backends
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one operator message and wait for the answer
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;

    /// Probe backend liveness
    async fn health(&self) -> Result<HealthStatus, BackendError>;

    /// Where chat requests go
    fn endpoint(&self) -> &str;
}

#[async_trait]
impl<T: ChatBackend + ?Sized> ChatBackend for Arc<T> {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        (**self).chat(request).await
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        (**self).health().await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

/// Logging wrapper for chat backends
pub struct LoggingBackend {
    inner: Arc<dyn ChatBackend>,
    endpoint: String,
}

impl LoggingBackend {
    pub fn new(inner: Arc<dyn ChatBackend>) -> Self {
        let endpoint = inner.endpoint().to_string();
        Self { inner, endpoint }
    }
}

#[async_trait]
impl ChatBackend for LoggingBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.chat(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(reply) => {
                tracing::info!(
                    endpoint = %self.endpoint,
                    thread_id = %request.thread_id,
                    duration_ms = %duration.as_millis(),
                    route = reply.route.as_deref().unwrap_or("-"),
                    sources = reply.sources.as_ref().map_or(0, Vec::len),
                    tools = reply.tools.as_ref().map_or(0, Vec::len),
                    reply_len = reply.reply.len(),
                    "Chat request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    endpoint = %self.endpoint,
                    thread_id = %request.thread_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    kind = ?e.kind,
                    "Chat request failed"
                );
            }
        }

        result
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let result = self.inner.health().await;
        match &result {
            Ok(health) => tracing::debug!(status = %health.status, "Health probe"),
            Err(e) => tracing::warn!(error = %e.message, "Health probe failed"),
        }
        result
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
