//! Conversation runtime executor

use super::{ChatSnapshot, Request};
use crate::backend::{BackendError, ChatBackend};
use crate::chunking::Unit;
use crate::ids::EntryId;
use crate::state_machine::{transition, ChatContext, ChatState, Effect, Event, TransitionError};
use crate::timeline::{MessageTimeline, TimelineEntry, TimelineError};
use futures::FutureExt;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};

/// A reply unit waiting for its turn to be shown
#[derive(Debug)]
struct FollowUp {
    due: Instant,
    unit: Unit,
}

/// Conversation runtime, generic over the backend implementation
pub struct ChatRuntime<B>
where
    B: ChatBackend + 'static,
{
    context: ChatContext,
    state: ChatState,
    timeline: MessageTimeline,
    backend: Arc<B>,
    request_rx: mpsc::Receiver<Request>,
    /// Backend outcomes posted by background call tasks
    outcome_tx: mpsc::UnboundedSender<Event>,
    outcome_rx: mpsc::UnboundedReceiver<Event>,
    snapshot_tx: watch::Sender<ChatSnapshot>,
    /// Undelivered follow-up units, in chunk order
    follow_ups: VecDeque<FollowUp>,
}

impl<B> ChatRuntime<B>
where
    B: ChatBackend + 'static,
{
    pub(crate) fn new(
        context: ChatContext,
        backend: B,
        seed: Vec<TimelineEntry>,
        request_rx: mpsc::Receiver<Request>,
    ) -> Self {
        let timeline = MessageTimeline::seeded(seed);
        let (snapshot_tx, _) = watch::channel(ChatSnapshot {
            entries: timeline.list_all(),
            busy: false,
            thread_id: context.thread_id.clone(),
        });
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        Self {
            context,
            state: ChatState::Idle,
            timeline,
            backend: Arc::new(backend),
            request_rx,
            outcome_tx,
            outcome_rx,
            snapshot_tx,
            follow_ups: VecDeque::new(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ChatSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Process requests, backend outcomes and follow-up deadlines until
    /// every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(thread_id = %self.context.thread_id, "Starting conversation runtime");

        loop {
            let next_due = self.follow_ups.front().map(|f| f.due);

            tokio::select! {
                request = self.request_rx.recv() => {
                    let Some(Request { event, ack }) = request else { break };
                    let result = self.process_event(event);
                    if let Err(e) = &result {
                        tracing::info!(error = %e, "Request rejected");
                    }
                    let _ = ack.send(result);
                }
                Some(event) = self.outcome_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::warn!(error = %e, "Discarding backend outcome");
                    }
                }
                () = sleep_until(next_due.unwrap_or_else(Instant::now)), if next_due.is_some() => {
                    self.deliver_due_follow_ups();
                }
            }
        }

        tracing::info!(thread_id = %self.context.thread_id, "Conversation runtime stopped");
    }

    fn process_event(&mut self, event: Event) -> Result<(), TransitionError> {
        let event_name = event.name();
        let result = transition(&self.state, &self.context, event)?;

        // State is committed before effects run, so `busy` clears even if an
        // effect below fails
        let old_state = std::mem::replace(&mut self.state, result.new_state);
        if old_state.is_busy() != self.state.is_busy() {
            tracing::debug!(event = event_name, busy = self.state.is_busy(), "State changed");
        }

        for effect in result.effects {
            self.execute_effect(effect);
        }

        self.publish();
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::AppendEntry { entry } => {
                if let Err(e) = self.timeline.append(entry) {
                    tracing::error!(error = %e, "Failed to append entry");
                }
            }

            Effect::ReplaceEntry { id, content } => match self.timeline.replace(&id, content) {
                Ok(()) => {}
                Err(TimelineError::EntryNotFound(id)) => {
                    tracing::warn!(entry_id = %id, "Placeholder no longer in timeline, reply dropped");
                }
                Err(e) => tracing::error!(error = %e, "Failed to replace entry"),
            },

            Effect::RequestReply {
                placeholder_id,
                message,
            } => self.request_reply(placeholder_id, message),

            Effect::ScheduleFollowUps { units } => {
                let now = Instant::now();
                let mut due = self.follow_ups.back().map_or(now, |f| f.due.max(now));
                for unit in units {
                    due += self.context.stagger;
                    self.follow_ups.push_back(FollowUp { due, unit });
                }
                tracing::debug!(pending = self.follow_ups.len(), "Scheduled follow-ups");
            }

            Effect::FlushFollowUps => {
                while let Some(follow_up) = self.follow_ups.pop_front() {
                    self.append_unit(follow_up.unit);
                }
            }

            Effect::DiscardFollowUps => {
                if !self.follow_ups.is_empty() {
                    tracing::debug!(count = self.follow_ups.len(), "Discarding follow-ups");
                    self.follow_ups.clear();
                }
            }

            Effect::ResetTimeline { seed } => {
                self.timeline.reset(seed);
                tracing::info!(entries = self.timeline.len(), "Timeline reset");
            }
        }
    }

    /// Spawn the backend call. The outcome always comes back as exactly one
    /// `ReplyReceived` or `ReplyFailed`, even if the backend panics.
    fn request_reply(&self, placeholder_id: EntryId, message: String) {
        let backend = Arc::clone(&self.backend);
        let outcome_tx = self.outcome_tx.clone();
        let request = self.context.chat_request(message);

        tokio::spawn(async move {
            tracing::debug!(placeholder_id = %placeholder_id, "Requesting reply");

            let outcome = AssertUnwindSafe(backend.chat(&request)).catch_unwind().await;
            let event = match outcome {
                Ok(Ok(reply)) => Event::ReplyReceived {
                    placeholder_id,
                    reply,
                },
                Ok(Err(error)) => Event::ReplyFailed {
                    placeholder_id,
                    error,
                },
                Err(_) => Event::ReplyFailed {
                    placeholder_id,
                    error: BackendError::unknown("backend call panicked"),
                },
            };

            // The runtime is gone if this fails; nothing left to resolve
            let _ = outcome_tx.send(event);
        });
    }

    fn deliver_due_follow_ups(&mut self) {
        let now = Instant::now();
        let mut delivered = false;
        while self.follow_ups.front().is_some_and(|f| f.due <= now) {
            if let Some(follow_up) = self.follow_ups.pop_front() {
                self.append_unit(follow_up.unit);
                delivered = true;
            }
        }
        if delivered {
            self.publish();
        }
    }

    fn append_unit(&mut self, unit: Unit) {
        let entry = TimelineEntry::new(EntryId::generate(), unit.into_content());
        if let Err(e) = self.timeline.append(entry) {
            tracing::error!(error = %e, "Failed to append follow-up");
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(ChatSnapshot {
            entries: self.timeline.list_all(),
            busy: self.state.is_busy(),
            thread_id: self.context.thread_id.clone(),
        });
    }
}
