//! Runtime for executing a conversation
//!
//! A single task owns the timeline and the coordinator state. Everything
//! else talks to it through a `ChatHandle` and observes it through
//! `ChatSnapshot`s published on a watch channel.

mod executor;

#[cfg(test)]
pub mod testing;

pub use executor::ChatRuntime;

use crate::backend::ChatBackend;
use crate::ids::EntryId;
use crate::state_machine::{ChatContext, Event, TransitionError};
use crate::timeline::TimelineEntry;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

/// First agent entry shown in a fresh timeline
pub const WELCOME_MESSAGE: &str =
    "Hi, I'm LumaWell, your health & wellness assistant. How can I help you today?";

/// Seed for a fresh timeline: a single welcome entry
pub fn welcome_seed() -> Vec<TimelineEntry> {
    vec![TimelineEntry::agent(EntryId::generate(), WELCOME_MESSAGE)]
}

/// Read-only view of the conversation, republished after every mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSnapshot {
    pub entries: Vec<TimelineEntry>,
    /// A remote call is outstanding; submissions will be rejected
    pub busy: bool,
    pub thread_id: String,
}

/// Event plus a channel to report whether the transition was accepted
#[derive(Debug)]
pub(crate) struct Request {
    pub event: Event,
    pub ack: oneshot::Sender<Result<(), TransitionError>>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error("Conversation runtime has stopped")]
    Stopped,
}

/// Handle to interact with a running conversation
#[derive(Clone)]
pub struct ChatHandle {
    request_tx: mpsc::Sender<Request>,
    snapshot_rx: watch::Receiver<ChatSnapshot>,
}

impl ChatHandle {
    /// Submit an operator message. Rejected while a reply is outstanding.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SubmitError> {
        self.send(Event::operator_message(text)).await
    }

    /// Replace the whole timeline with `seed`. The thread id is unaffected.
    pub async fn reset(&self, seed: Vec<TimelineEntry>) -> Result<(), SubmitError> {
        self.send(Event::Reset { seed }).await
    }

    /// Current view of the conversation
    pub fn snapshot(&self) -> ChatSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that is notified on every change
    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_rx.clone()
    }

    async fn send(&self, event: Event) -> Result<(), SubmitError> {
        let (ack, ack_rx) = oneshot::channel();
        self.request_tx
            .send(Request { event, ack })
            .await
            .map_err(|_| SubmitError::Stopped)?;
        ack_rx
            .await
            .map_err(|_| SubmitError::Stopped)?
            .map_err(SubmitError::from)
    }
}

/// Start a conversation runtime on the current tokio runtime
pub fn spawn<B: ChatBackend + 'static>(
    context: ChatContext,
    backend: B,
    seed: Vec<TimelineEntry>,
) -> ChatHandle {
    let (request_tx, request_rx) = mpsc::channel(32);
    let runtime = ChatRuntime::new(context, backend, seed, request_rx);
    let snapshot_rx = runtime.subscribe();
    tokio::spawn(runtime.run());
    ChatHandle {
        request_tx,
        snapshot_rx,
    }
}
