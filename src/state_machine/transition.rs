//! Pure state transition function
//!
//! Given the same state and event, `transition` always returns the same new
//! state and effects. It performs no I/O.

use super::{ChatContext, ChatState, Effect, Event};
use crate::backend::ChatReply;
use crate::chunking;
use crate::ids::EntryId;
use thiserror::Error;

/// Placeholder text when the backend answered with nothing to show
pub const NO_CONTENT_MESSAGE: &str = "(No content in reply)";

/// Prefix of the message that replaces a placeholder after a failed call
pub const FAILURE_PREFIX: &str = "⚠️ Request failed: ";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Still waiting for the previous reply")]
    Busy,
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    state: &ChatState,
    _context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Operator submissions
        // ============================================================
        (_, Event::OperatorMessage { text, .. }) if text.trim().is_empty() => {
            Err(TransitionError::EmptyMessage)
        }

        // Idle + OperatorMessage -> AwaitingReply
        (
            ChatState::Idle,
            Event::OperatorMessage {
                text,
                entry_id,
                placeholder_id,
            },
        ) => {
            let text = text.trim().to_string();
            Ok(TransitionResult::new(ChatState::AwaitingReply {
                placeholder_id: placeholder_id.clone(),
            })
            .with_effect(Effect::FlushFollowUps)
            .with_effect(Effect::append_operator(entry_id, text.clone()))
            .with_effect(Effect::append_placeholder(placeholder_id.clone()))
            .with_effect(Effect::RequestReply {
                placeholder_id,
                message: text,
            }))
        }

        // One call in flight at a time
        (ChatState::AwaitingReply { .. }, Event::OperatorMessage { .. }) => {
            Err(TransitionError::Busy)
        }

        // ============================================================
        // Resolution
        // ============================================================

        // AwaitingReply + ReplyReceived -> Idle
        (
            ChatState::AwaitingReply { placeholder_id },
            Event::ReplyReceived {
                placeholder_id: resolved,
                reply,
            },
        ) if *placeholder_id == resolved => Ok(TransitionResult::new(ChatState::Idle)
            .with_effects(resolve_reply(placeholder_id.clone(), &reply))),

        // AwaitingReply + ReplyFailed -> Idle
        (
            ChatState::AwaitingReply { placeholder_id },
            Event::ReplyFailed {
                placeholder_id: resolved,
                error,
            },
        ) if *placeholder_id == resolved => {
            Ok(TransitionResult::new(ChatState::Idle).with_effect(Effect::resolve_with_text(
                placeholder_id.clone(),
                format!("{FAILURE_PREFIX}{}", error.message),
            )))
        }

        // ============================================================
        // Reset - accepted in any state, an in-flight call keeps running
        // ============================================================
        (state, Event::Reset { seed }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::DiscardFollowUps)
            .with_effect(Effect::ResetTimeline { seed })),

        // ============================================================
        // Invalid Transitions
        // ============================================================
        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {state:?} with event {}",
            event.name()
        ))),
    }
}

/// First unit replaces the placeholder, the rest follow staggered
fn resolve_reply(placeholder_id: EntryId, reply: &ChatReply) -> Vec<Effect> {
    let mut units = chunking::split(&reply.reply).into_iter();
    match units.next() {
        None => vec![Effect::resolve_with_text(placeholder_id, NO_CONTENT_MESSAGE)],
        Some(first) => {
            let mut effects = vec![Effect::ReplaceEntry {
                id: placeholder_id,
                content: first.into_content(),
            }];
            let rest: Vec<_> = units.collect();
            if !rest.is_empty() {
                effects.push(Effect::ScheduleFollowUps { units: rest });
            }
            effects
        }
    }
}
