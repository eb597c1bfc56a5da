//! Persistence collaborators
//!
//! The recorder and player never talk to storage directly. Hosts hand a
//! finished [`LogEnvelope`](crate::types::LogEnvelope) to a [`RecordStore`]
//! and build players from what it returns.
//!
//! # Implementations
//!
//! - [`HttpRecordStore`] - The application API plus the REST table interface
//! - [`MemoryRecordStore`] - In-process store for hosts without a backend
//! - [`LocalLogStore`] - Unsaved log and first-playback markers on a
//!   [`KeyValueStore`]

pub mod http;
pub mod local;
pub mod memory;

pub use http::HttpRecordStore;
pub use local::{FileKeyValueStore, KeyValueStore, LocalLogStore, MemoryKeyValueStore};
pub use memory::MemoryRecordStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SessionId, SessionLog};

/// Durable store for session logs keyed by session id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist `log` under `session_id`
    async fn save(&self, session_id: &SessionId, log: &SessionLog) -> Result<()>;

    /// Whether a log is already stored under `session_id`
    async fn exists(&self, session_id: &SessionId) -> Result<bool>;

    /// Fetch the log stored under `session_id`, in capture order.
    ///
    /// Implementations apply [`normalize_time_diffs`] before returning.
    async fn fetch_by_session(&self, session_id: &SessionId) -> Result<SessionLog>;
}

/// Replace missing timing data with `default_ms`.
///
/// Entries with a `timeDiff` of zero (or none at all on the wire) get the
/// default gap so replay of older logs still has a rhythm. Returns how many
/// entries were changed.
pub fn normalize_time_diffs(log: &mut SessionLog, default_ms: u64) -> usize {
    let mut changed = 0;
    for entry in log.entries_mut() {
        if !entry.has_timing() {
            entry.time_diff = default_ms;
            changed += 1;
        }
    }
    if changed > 0 {
        tracing::debug!(changed, default_ms, "Normalized missing time diffs");
    }
    changed
}
