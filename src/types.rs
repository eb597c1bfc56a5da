//! Core data types for retype-rs
//!
//! This module contains the patch log data model shared by the recorder,
//! the player and the persistence collaborators.
//!
//! # Main Types
//!
//! - [`PatchEntry`] - One recorded edit step with its timing
//! - [`SessionLog`] - The ordered, replayable sequence of entries
//! - [`SessionId`] - Opaque token identifying a persisted log
//! - [`LogEnvelope`] - Wire shape handed to the persistence collaborator
//!
//! # Wire format
//!
//! ```json
//! {
//!   "sessionId": "_k3j9x0a2q",
//!   "records": [
//!     { "diffs": [...], "timestamp": 1718000000000, "timeDiff": 0 },
//!     { "diffs": [...], "timestamp": 1718000000200, "timeDiff": 200 }
//!   ]
//! }
//! ```

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, RetypeError};
use crate::patch::{patch_apply, Patch};

/// One recorded edit step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchEntry {
    /// Patches turning the previous full text into this step's text
    pub diffs: Vec<Patch>,
    /// Capture time in milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Milliseconds since the previous entry; 0 means no timing data
    #[serde(rename = "timeDiff", default, deserialize_with = "null_as_zero")]
    pub time_diff: u64,
}

impl PatchEntry {
    /// Create a new entry
    pub fn new(diffs: Vec<Patch>, timestamp: i64, time_diff: u64) -> Self {
        Self {
            diffs,
            timestamp,
            time_diff,
        }
    }

    /// Whether the entry carries usable timing data
    pub fn has_timing(&self) -> bool {
        self.time_diff > 0
    }
}

fn null_as_zero<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// An ordered, replayable sequence of patch entries
///
/// Insertion order is replay order: every entry's patches are defined
/// relative to the text produced by all entries before it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionLog {
    entries: Vec<PatchEntry>,
}

impl SessionLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap existing entries, keeping their order
    pub fn from_entries(entries: Vec<PatchEntry>) -> Self {
        Self { entries }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in replay order
    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    /// Mutable access for boundary repairs such as timing normalization
    pub fn entries_mut(&mut self) -> &mut [PatchEntry] {
        &mut self.entries
    }

    /// Get an entry by cursor position
    pub fn get(&self, index: usize) -> Option<&PatchEntry> {
        self.entries.get(index)
    }

    /// The most recently appended entry
    pub fn last(&self) -> Option<&PatchEntry> {
        self.entries.last()
    }

    /// Iterate over entries in replay order
    pub fn iter(&self) -> std::slice::Iter<'_, PatchEntry> {
        self.entries.iter()
    }

    pub(crate) fn push(&mut self, entry: PatchEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Consume the log, returning its entries
    pub fn into_entries(self) -> Vec<PatchEntry> {
        self.entries
    }

    /// Wall-clock span between the first and last capture, in milliseconds
    pub fn span_ms(&self) -> u64 {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => last.timestamp.saturating_sub(first.timestamp).max(0) as u64,
            _ => 0,
        }
    }

    /// Apply every entry to an empty buffer without pacing.
    ///
    /// Returns the reconstructed text and the indices of entries whose
    /// patches did not all apply cleanly.
    pub fn reconstruct(&self) -> (String, Vec<usize>) {
        let mut text = String::new();
        let mut failed = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            let (next, flags) = patch_apply(&entry.diffs, &text);
            if flags.iter().any(|ok| !ok) {
                failed.push(index);
            }
            text = next;
        }
        (text, failed)
    }
}

impl<'a> IntoIterator for &'a SessionLog {
    type Item = &'a PatchEntry;
    type IntoIter = std::slice::Iter<'a, PatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl From<Vec<PatchEntry>> for SessionLog {
    fn from(entries: Vec<PatchEntry>) -> Self {
        Self::from_entries(entries)
    }
}

/// Characters used for generated session ids
const SESSION_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of random characters in a generated session id
const SESSION_ID_RANDOM_LEN: usize = 9;

/// Opaque token identifying a persisted log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh id: `_` followed by nine base-36 characters
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut id = String::with_capacity(SESSION_ID_RANDOM_LEN + 1);
        id.push('_');
        for _ in 0..SESSION_ID_RANDOM_LEN {
            let idx = rng.gen_range(0..SESSION_ID_ALPHABET.len());
            id.push(SESSION_ID_ALPHABET[idx] as char);
        }
        Self(id)
    }

    /// Accept an id received from outside (query string, storage key).
    ///
    /// Ids must be non-empty and free of whitespace and URL delimiters.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && !raw
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '&' | '?' | '#' | '/' | '='));
        if valid {
            Ok(Self(raw))
        } else {
            Err(RetypeError::InvalidSessionId(raw))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A log together with its session id, as sent to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEnvelope {
    #[serde(rename = "sessionId")]
    pub session_id: SessionId,
    pub records: SessionLog,
}

impl LogEnvelope {
    pub fn new(session_id: SessionId, records: SessionLog) -> Self {
        Self {
            session_id,
            records,
        }
    }
}
