//! Mock helpers for testing

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use retype_rs::{RecordStore, Result, RetypeError, SessionId, SessionLog};

/// Record store whose every call fails, counting attempts
#[derive(Debug, Default)]
pub struct UnreachableStore {
    pub calls: AtomicUsize,
}

impl UnreachableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RetypeError::PersistenceFailure("backend unreachable".to_string()))
    }
}

#[async_trait]
impl RecordStore for UnreachableStore {
    async fn save(&self, _session_id: &SessionId, _log: &SessionLog) -> Result<()> {
        self.fail()
    }

    async fn exists(&self, _session_id: &SessionId) -> Result<bool> {
        self.fail()
    }

    async fn fetch_by_session(&self, _session_id: &SessionId) -> Result<SessionLog> {
        self.fail()
    }
}
