//! Text diff and patch engine
//!
//! Every recorded keystroke is stored as a list of [`Patch`] values that turn
//! the previous full text into the new one. Patches carry a little context
//! around each edit so they can still be placed when the buffer they are
//! applied to has drifted from the one they were made against.
//!
//! # Pipeline
//!
//! 1. [`diff_main`] computes a character-level diff
//! 2. [`cleanup_semantic`] folds away trivial equalities so edits read as
//!    whole words and phrases rather than scattered characters
//! 3. [`patch_make`] groups the diff into context-carrying patches
//! 4. [`patch_apply`] replays patches against a buffer, reporting a success
//!    flag for each one
//!
//! Offsets and lengths are measured in Unicode scalar values, never bytes.
//!
//! # Wire format
//!
//! A diff span serializes as a two-element array `[op, text]` where `op` is
//! `-1` (delete), `0` (equal) or `1` (insert). A patch serializes as
//! `{ "diffs": [...], "start1", "start2", "length1", "length2" }`.

pub mod apply;
pub mod diff;
pub mod make;

pub use apply::patch_apply;
pub use diff::{cleanup_merge, cleanup_semantic, diff_main};
pub use make::{patch_make, MATCH_MAX_BITS, PATCH_MARGIN};

use serde::{Deserialize, Serialize};

/// Kind of a diff span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Operation {
    /// Text present only in the source
    Delete,
    /// Text shared by source and target
    Equal,
    /// Text present only in the target
    Insert,
}

impl From<Operation> for i8 {
    fn from(op: Operation) -> Self {
        match op {
            Operation::Delete => -1,
            Operation::Equal => 0,
            Operation::Insert => 1,
        }
    }
}

impl TryFrom<i8> for Operation {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Operation::Delete),
            0 => Ok(Operation::Equal),
            1 => Ok(Operation::Insert),
            other => Err(format!("unknown diff operation {}", other)),
        }
    }
}

/// One span of a diff: an operation and the text it covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diff(pub Operation, pub String);

impl Diff {
    pub fn equal(text: impl Into<String>) -> Self {
        Diff(Operation::Equal, text.into())
    }

    pub fn delete(text: impl Into<String>) -> Self {
        Diff(Operation::Delete, text.into())
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Diff(Operation::Insert, text.into())
    }

    pub fn op(&self) -> Operation {
        self.0
    }

    pub fn text(&self) -> &str {
        &self.1
    }

    /// Length of the span in characters
    pub fn char_len(&self) -> usize {
        self.1.chars().count()
    }
}

/// A single context-carrying edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    /// Spans making up the patch, including leading/trailing context
    pub diffs: Vec<Diff>,
    /// Offset of the patch in the source text
    pub start1: usize,
    /// Offset of the patch in the target text
    pub start2: usize,
    /// Characters of source text covered
    pub length1: usize,
    /// Characters of target text covered
    pub length2: usize,
}

impl Patch {
    /// Text this patch expects to find (context plus deletions)
    pub fn source_text(&self) -> String {
        source_of(&self.diffs)
    }

    /// Text this patch leaves behind (context plus insertions)
    pub fn target_text(&self) -> String {
        target_of(&self.diffs)
    }

    /// Split off leading and trailing context.
    ///
    /// Returns the character length of the leading context and the spans in
    /// between.
    pub fn core(&self) -> (usize, &[Diff]) {
        let mut lo = 0;
        let mut hi = self.diffs.len();
        let mut lead = 0;
        if let Some(first) = self.diffs.first() {
            if first.0 == Operation::Equal {
                lo = 1;
                lead = first.char_len();
            }
        }
        if hi > lo && self.diffs[hi - 1].0 == Operation::Equal {
            hi -= 1;
        }
        (lead, &self.diffs[lo..hi])
    }
}

pub(crate) fn source_of(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.0 != Operation::Insert)
        .map(|d| d.1.as_str())
        .collect()
}

pub(crate) fn target_of(diffs: &[Diff]) -> String {
    diffs
        .iter()
        .filter(|d| d.0 != Operation::Delete)
        .map(|d| d.1.as_str())
        .collect()
}

/// Build the patches that turn `old` into `new`.
///
/// Runs the full pipeline: diff, semantic cleanup, and patch construction.
pub fn make_patches(old: &str, new: &str) -> Vec<Patch> {
    let mut diffs = diff_main(old, new);
    cleanup_semantic(&mut diffs);
    patch_make(old, &diffs)
}
