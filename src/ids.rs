//! Timeline entry identifiers
//!
//! Ids combine a microsecond timestamp with a random alphanumeric suffix.
//! They are unique in practice within a process; nothing about them is
//! meant to be unguessable.

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

const SUFFIX_LEN: usize = 10;

/// Opaque identifier of a timeline entry
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Produce a fresh id
    pub fn generate() -> Self {
        let micros = Utc::now().timestamp_micros();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();
        Self(format!("{micros:x}-{suffix}"))
    }

    #[allow(dead_code)] // Used in tests
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
