//! Events that can occur in a conversation

use crate::backend::{BackendError, ChatReply};
use crate::ids::EntryId;
use crate::timeline::TimelineEntry;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Operator events
    OperatorMessage {
        text: String,
        /// Id for the operator's own entry
        entry_id: EntryId,
        /// Id for the placeholder that will hold the reply
        placeholder_id: EntryId,
    },
    Reset {
        seed: Vec<TimelineEntry>,
    },

    // Backend events
    ReplyReceived {
        placeholder_id: EntryId,
        reply: ChatReply,
    },
    ReplyFailed {
        placeholder_id: EntryId,
        error: BackendError,
    },
}

impl Event {
    /// Operator message with freshly generated entry ids
    pub fn operator_message(text: impl Into<String>) -> Self {
        Event::OperatorMessage {
            text: text.into(),
            entry_id: EntryId::generate(),
            placeholder_id: EntryId::generate(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Event::OperatorMessage { .. } => "operator_message",
            Event::Reset { .. } => "reset",
            Event::ReplyReceived { .. } => "reply_received",
            Event::ReplyFailed { .. } => "reply_failed",
        }
    }
}
