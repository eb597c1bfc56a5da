//! In-process record store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::{PlaybackSettings, DEFAULT_TIME_DIFF_MS};
use crate::error::Result;
use crate::types::{SessionId, SessionLog};

use super::{normalize_time_diffs, RecordStore};

/// [`RecordStore`] keeping logs in memory
///
/// Saving under an existing id replaces the stored log.
#[derive(Debug)]
pub struct MemoryRecordStore {
    logs: RwLock<HashMap<SessionId, SessionLog>>,
    default_time_diff_ms: u64,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
            default_time_diff_ms: DEFAULT_TIME_DIFF_MS,
        }
    }

    /// Create a store whose fetches use the playback timing fallback
    pub fn from_settings(settings: &PlaybackSettings) -> Self {
        Self::new().with_default_time_diff(settings.default_time_diff_ms)
    }

    /// Override the pacing given to fetched entries without timing data
    pub fn with_default_time_diff(mut self, millis: u64) -> Self {
        self.default_time_diff_ms = millis;
        self
    }

    /// Number of stored sessions
    pub fn len(&self) -> usize {
        self.logs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.read().is_empty()
    }

    /// The log exactly as saved, without fetch normalization
    pub fn raw(&self, session_id: &SessionId) -> Option<SessionLog> {
        self.logs.read().get(session_id).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save(&self, session_id: &SessionId, log: &SessionLog) -> Result<()> {
        self.logs.write().insert(session_id.clone(), log.clone());
        tracing::debug!(%session_id, entries = log.len(), "Stored session log in memory");
        Ok(())
    }

    async fn exists(&self, session_id: &SessionId) -> Result<bool> {
        Ok(self.logs.read().contains_key(session_id))
    }

    /// Unknown ids yield an empty log, like a table query with no rows
    async fn fetch_by_session(&self, session_id: &SessionId) -> Result<SessionLog> {
        let mut log = self.raw(session_id).unwrap_or_default();
        normalize_time_diffs(&mut log, self.default_time_diff_ms);
        Ok(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::make_patches;
    use crate::types::PatchEntry;

    #[tokio::test]
    async fn test_save_exists_fetch() {
        let store = MemoryRecordStore::new();
        let id = SessionId::generate();
        assert!(!store.exists(&id).await.unwrap());

        let log = SessionLog::from_entries(vec![
            PatchEntry::new(make_patches("", "a"), 0, 0),
            PatchEntry::new(make_patches("a", "ab"), 120, 120),
        ]);
        store.save(&id, &log).await.unwrap();
        assert!(store.exists(&id).await.unwrap());

        let fetched = store.fetch_by_session(&id).await.unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched.get(0).unwrap().time_diff, 1000);
        assert_eq!(fetched.get(1).unwrap().time_diff, 120);
        assert_eq!(store.raw(&id).unwrap(), log);
    }

    #[tokio::test]
    async fn test_fetch_uses_configured_default_time_diff() {
        let settings = PlaybackSettings {
            default_time_diff_ms: 250,
            ..Default::default()
        };
        let store = MemoryRecordStore::from_settings(&settings);
        let id = SessionId::generate();
        let log = SessionLog::from_entries(vec![PatchEntry::new(make_patches("", "a"), 0, 0)]);
        store.save(&id, &log).await.unwrap();

        let fetched = store.fetch_by_session(&id).await.unwrap();
        assert_eq!(fetched.get(0).unwrap().time_diff, 250);
        assert_eq!(store.raw(&id).unwrap().get(0).unwrap().time_diff, 0);
    }

    #[tokio::test]
    async fn test_fetch_unknown_is_empty() {
        let store = MemoryRecordStore::new();
        let log = store.fetch_by_session(&SessionId::generate()).await.unwrap();
        assert!(log.is_empty());
    }
}
