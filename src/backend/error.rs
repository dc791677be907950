//! Backend error types

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Shown when a failed response carries no body at all
pub const EMPTY_BODY: &str = "(empty body)";

/// Backend error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    /// User-facing failure detail
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Network, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(BackendErrorKind::Unknown, message)
    }

    /// Non-success status. The message reads `"<status> <detail>"`, where the
    /// detail is the body's `detail` field if the body is JSON carrying one,
    /// else the raw body, else `(empty body)`.
    pub fn status(status: StatusCode, body: &str) -> Self {
        Self::new(
            BackendErrorKind::Status(status.as_u16()),
            format!("{} {}", status.as_u16(), extract_detail(body)),
        )
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    /// Request never reached the server or the connection dropped
    Network,
    /// Server answered with a non-success status
    Status(u16),
    /// Success status but the body was not a valid reply
    Decode,
    /// Anything else, including a panicking backend
    Unknown,
}

fn extract_detail(body: &str) -> String {
    if body.trim().is_empty() {
        return EMPTY_BODY.to_string();
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(detail)) => detail.clone(),
            Some(Value::Null) | None => body.to_string(),
            Some(other) => other.to_string(),
        },
        _ => body.to_string(),
    }
}
