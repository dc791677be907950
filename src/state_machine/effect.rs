//! Effects produced by state transitions

use crate::chunking::Unit;
use crate::ids::EntryId;
use crate::timeline::{EntryContent, TimelineEntry};

/// Effects to be executed after state transition, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Add an entry at the end of the timeline
    AppendEntry { entry: TimelineEntry },

    /// Swap the content of an existing entry in place
    ReplaceEntry { id: EntryId, content: EntryContent },

    /// Issue the remote chat call (runs in the background)
    RequestReply {
        placeholder_id: EntryId,
        message: String,
    },

    /// Queue the remaining reply units for staggered delivery
    ScheduleFollowUps { units: Vec<Unit> },

    /// Append every undelivered follow-up right away
    FlushFollowUps,

    /// Drop every undelivered follow-up
    DiscardFollowUps,

    /// Replace the whole timeline
    ResetTimeline { seed: Vec<TimelineEntry> },
}

impl Effect {
    pub fn append_operator(id: EntryId, text: impl Into<String>) -> Self {
        Effect::AppendEntry {
            entry: TimelineEntry::operator(id, text),
        }
    }

    pub fn append_placeholder(id: EntryId) -> Self {
        Effect::AppendEntry {
            entry: TimelineEntry::pending(id),
        }
    }

    pub fn resolve_with_text(id: EntryId, body: impl Into<String>) -> Self {
        Effect::ReplaceEntry {
            id,
            content: EntryContent::agent(body),
        }
    }
}
