//! Wire types for the chat backend

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub thread_id: String,
    pub message: String,
    pub city: Option<String>,
    pub realtime: bool,
}

/// Successful `POST /chat` response.
///
/// Only `reply` drives the timeline; the rest is passed through for logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
    #[serde(default)]
    pub tools: Option<Vec<Value>>,
}

impl ChatReply {
    #[allow(dead_code)] // Used in tests
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            route: None,
            sources: None,
            tools: None,
        }
    }
}

/// `GET /health` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
