//! Conversation timeline
//!
//! An append-only, insertion-ordered list of entries. Entries are never
//! removed one at a time: the only way to drop entries is a full reset.

use crate::ids::EntryId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the conversation an entry is drawn on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Agent-originated
    Incoming,
    /// Operator-originated
    Outgoing,
}

impl Side {
    pub fn avatar(self) -> Avatar {
        match self {
            Side::Incoming => Avatar::Agent,
            Side::Outgoing => Avatar::Operator,
        }
    }
}

/// Visual identity of a speaker, constant per side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Avatar {
    Operator,
    Agent,
}

impl Avatar {
    pub fn glyph(self) -> &'static str {
        match self {
            Avatar::Operator => "🧐",
            Avatar::Agent => "🤖",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Avatar::Operator => "User",
            Avatar::Agent => "LumaWell",
        }
    }
}

/// What an entry shows. Side and avatar follow from the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryContent {
    OperatorText { body: String },
    AgentText { body: String },
    /// Reply is still being computed
    Pending,
}

impl EntryContent {
    pub fn operator(body: impl Into<String>) -> Self {
        EntryContent::OperatorText { body: body.into() }
    }

    pub fn agent(body: impl Into<String>) -> Self {
        EntryContent::AgentText { body: body.into() }
    }

    pub fn side(&self) -> Side {
        match self {
            EntryContent::OperatorText { .. } => Side::Outgoing,
            EntryContent::AgentText { .. } | EntryContent::Pending => Side::Incoming,
        }
    }

    #[allow(dead_code)] // Used in tests
    pub fn body(&self) -> Option<&str> {
        match self {
            EntryContent::OperatorText { body } | EntryContent::AgentText { body } => Some(body),
            EntryContent::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntryContent::Pending)
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, EntryContent::OperatorText { .. })
    }
}

/// One displayed turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: EntryId,
    #[serde(flatten)]
    pub content: EntryContent,
}

impl TimelineEntry {
    pub fn new(id: EntryId, content: EntryContent) -> Self {
        Self { id, content }
    }

    pub fn operator(id: EntryId, body: impl Into<String>) -> Self {
        Self::new(id, EntryContent::operator(body))
    }

    pub fn agent(id: EntryId, body: impl Into<String>) -> Self {
        Self::new(id, EntryContent::agent(body))
    }

    pub fn pending(id: EntryId) -> Self {
        Self::new(id, EntryContent::Pending)
    }

    pub fn side(&self) -> Side {
        self.content.side()
    }

    pub fn avatar(&self) -> Avatar {
        self.side().avatar()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Entry id already present in timeline: {0}")]
    DuplicateId(EntryId),
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),
    #[error("A pending placeholder already exists: {0}")]
    PlaceholderOutstanding(EntryId),
    #[error("Operator entries cannot be replaced: {0}")]
    OperatorEntryImmutable(EntryId),
}

/// Ordered collection of timeline entries
#[derive(Debug, Clone, Default)]
pub struct MessageTimeline {
    entries: Vec<TimelineEntry>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timeline seeded with the given entries, in order
    pub fn seeded(seed: Vec<TimelineEntry>) -> Self {
        let mut timeline = Self::new();
        timeline.reset(seed);
        timeline
    }

    /// Add an entry at the end
    pub fn append(&mut self, entry: TimelineEntry) -> Result<(), TimelineError> {
        if self.position(&entry.id).is_some() {
            return Err(TimelineError::DuplicateId(entry.id));
        }
        if entry.content.is_pending() {
            if let Some(existing) = self.pending_placeholder() {
                return Err(TimelineError::PlaceholderOutstanding(existing.id.clone()));
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Swap the content of an existing entry, keeping its id and position.
    ///
    /// A missing id leaves the timeline untouched and reports
    /// `EntryNotFound`; no entry is ever created under the old id.
    pub fn replace(&mut self, id: &EntryId, content: EntryContent) -> Result<(), TimelineError> {
        let index = self
            .position(id)
            .ok_or_else(|| TimelineError::EntryNotFound(id.clone()))?;

        if self.entries[index].content.is_operator() {
            return Err(TimelineError::OperatorEntryImmutable(id.clone()));
        }
        if content.is_pending() {
            if let Some(existing) = self.pending_placeholder() {
                if &existing.id != id {
                    return Err(TimelineError::PlaceholderOutstanding(existing.id.clone()));
                }
            }
        }

        self.entries[index].content = content;
        Ok(())
    }

    /// Discard everything and start over from `seed`.
    ///
    /// Seed entries are settled content: a pending placeholder would never be
    /// resolved, so those are dropped along with duplicate ids.
    pub fn reset(&mut self, seed: Vec<TimelineEntry>) {
        self.entries.clear();
        for entry in seed {
            if entry.content.is_pending() {
                tracing::warn!(entry_id = %entry.id, "Dropping pending seed entry");
                continue;
            }
            if let Err(e) = self.append(entry) {
                tracing::warn!(error = %e, "Dropping invalid seed entry");
            }
        }
    }

    /// Snapshot of all entries in insertion order
    pub fn list_all(&self) -> Vec<TimelineEntry> {
        self.entries.clone()
    }

    #[allow(dead_code)] // Used in tests
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    #[allow(dead_code)] // Used in tests
    pub fn get(&self, id: &EntryId) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn pending_placeholder(&self) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.content.is_pending())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)] // Used in tests
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &EntryId) -> Option<usize> {
        self.entries.iter().position(|e| &e.id == id)
    }
}
