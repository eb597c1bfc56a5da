//! Local key-value storage for the unsaved log and playback markers

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::{ensure_app_data_dir, local_store_path, LOCAL_STORE_FILE};
use crate::error::{Result, ResultExt, RetypeError};
use crate::types::{SessionId, SessionLog};

/// Key holding the unsaved local log
pub const RECORDS_KEY: &str = "records";

/// Prefix of the per-session first-playback marker keys
pub const INITIAL_PLAYBACK_PREFIX: &str = "initialPlaybackTime-";

/// String key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// [`KeyValueStore`] kept in memory
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// [`KeyValueStore`] persisted as one JSON object on disk
///
/// The whole map is rewritten on every change through a temporary file and
/// a rename.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open the store at `path`; a missing file starts empty
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries: BTreeMap<String, String> = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(RetypeError::from)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .map_err(RetypeError::from)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            BTreeMap::new()
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened local store");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Open `local_store.json` inside `dir`
    pub fn open_in(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(dir.as_ref().join(LOCAL_STORE_FILE))
    }

    /// Open the store in the app data directory, creating the directory
    pub fn open_default() -> Result<Self> {
        ensure_app_data_dir()?;
        let path = local_store_path().ok_or_else(|| {
            RetypeError::Config("Could not determine local store path".to_string())
        })?;
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)
            .map_err(RetypeError::from)
            .with_context(|| format!("Failed to write {}", self.path.display()))
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// The unsaved log and first-playback markers on top of a [`KeyValueStore`]
#[derive(Clone)]
pub struct LocalLogStore {
    store: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for LocalLogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLogStore").finish_non_exhaustive()
    }
}

impl LocalLogStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Backed by the JSON file in the app data directory
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(Arc::new(FileKeyValueStore::open_default()?)))
    }

    /// A store that forgets everything when dropped
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// The unsaved log; empty when none was stored
    pub fn load_log(&self) -> Result<SessionLog> {
        match self.store.get(RECORDS_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(RetypeError::from)
                .context("Stored local log is malformed"),
            None => Ok(SessionLog::new()),
        }
    }

    pub fn save_log(&self, log: &SessionLog) -> Result<()> {
        let raw = serde_json::to_string(log)?;
        self.store.set(RECORDS_KEY, &raw)
    }

    pub fn clear_log(&self) -> Result<()> {
        self.store.remove(RECORDS_KEY)
    }

    /// When `session_id` was first played back on this machine
    pub fn first_playback(&self, session_id: &SessionId) -> Result<Option<String>> {
        self.store.get(&initial_playback_key(session_id))
    }

    pub fn mark_first_playback(&self, session_id: &SessionId, when: &str) -> Result<()> {
        self.store.set(&initial_playback_key(session_id), when)
    }
}

fn initial_playback_key(session_id: &SessionId) -> String {
    format!("{}{}", INITIAL_PLAYBACK_PREFIX, session_id)
}
