//! Coordinator state types

use crate::backend::ChatRequest;
use crate::ids::EntryId;
use std::time::Duration;

/// Delay between consecutive follow-up bubbles
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(60);

/// Coordinator state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatState {
    /// No outstanding remote call, submissions accepted
    #[default]
    Idle,

    /// Exactly one remote call in flight, resolving `placeholder_id`
    AwaitingReply { placeholder_id: EntryId },
}

impl ChatState {
    /// Whether a remote call is outstanding
    pub fn is_busy(&self) -> bool {
        matches!(self, ChatState::AwaitingReply { .. })
    }

    #[allow(dead_code)] // Used in tests
    pub fn placeholder_id(&self) -> Option<&EntryId> {
        match self {
            ChatState::Idle => None,
            ChatState::AwaitingReply { placeholder_id } => Some(placeholder_id),
        }
    }
}

/// Context for a conversation (immutable configuration)
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub thread_id: String,
    pub city: Option<String>,
    pub realtime: bool,
    pub stagger: Duration,
}

impl ChatContext {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            city: None,
            realtime: true,
            stagger: DEFAULT_STAGGER,
        }
    }

    pub fn with_city(mut self, city: Option<String>) -> Self {
        self.city = city;
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    /// Build the backend request for one operator message
    pub fn chat_request(&self, message: impl Into<String>) -> ChatRequest {
        ChatRequest {
            thread_id: self.thread_id.clone(),
            message: message.into(),
            city: self.city.clone(),
            realtime: self.realtime,
        }
    }
}
