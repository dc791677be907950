//! Reply chunking
//!
//! Splits a raw answer into display units at paragraph breaks. A break is a
//! line ending followed by one or more blank lines, where any Unicode
//! whitespace counts as blank.

use crate::timeline::{Avatar, EntryContent, Side};
use regex::Regex;
use std::sync::LazyLock;

static PARAGRAPH_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r?\n(?:[^\S\n]*\n)+").expect("paragraph break pattern is valid")
});

/// Separator used when joining units back together
#[allow(dead_code)] // Used in tests
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// One display unit of an agent reply. The caller assigns the entry id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub body: String,
}

impl Unit {
    #[allow(dead_code, clippy::unused_self)] // Used in tests; every unit is agent-originated
    pub fn side(&self) -> Side {
        Side::Incoming
    }

    #[allow(dead_code)] // Used in tests
    pub fn avatar(&self) -> Avatar {
        self.side().avatar()
    }

    pub fn into_content(self) -> EntryContent {
        EntryContent::AgentText { body: self.body }
    }
}

/// Split `raw` into trimmed, non-empty paragraphs in original order.
///
/// Empty or whitespace-only input yields no units.
pub fn split(raw: &str) -> Vec<Unit> {
    PARAGRAPH_BREAK
        .split(raw)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| Unit {
            body: piece.to_string(),
        })
        .collect()
}
