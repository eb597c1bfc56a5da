//! Configuration module for retype-rs
//!
//! This module handles engine configuration including:
//! - Recorder limits and countdown budget
//! - Replay pacing
//! - Endpoints of the remote record store
//! - Logging output
//!
//! # App Data Location
//!
//! The config file and local stores live in the platform-appropriate
//! location:
//! - **Linux**: `~/.local/share/dev.retype.retype-rs/`
//! - **macOS**: `~/Library/Application Support/dev.retype.retype-rs/`
//! - **Windows**: `%APPDATA%\dev.retype.retype-rs\`
//!
//! # Files
//!
//! - `retype.toml` - Engine configuration
//! - `local_store.json` - Unsaved log and first-playback markers
//!
//! # Example
//!
//! ```ignore
//! use retype_rs::config::EngineConfig;
//!
//! let mut config = EngineConfig::load_or_default();
//! config.playback.min_interval_ms = 80;
//! config.save_default()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{Result, RetypeError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.retype.retype-rs";

/// Config filename
pub const CONFIG_FILE: &str = "retype.toml";

/// Local store filename
pub const LOCAL_STORE_FILE: &str = "local_store.json";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        RetypeError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            RetypeError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the config file
pub fn config_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(CONFIG_FILE))
}

/// Get the path to the local store file
pub fn local_store_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(LOCAL_STORE_FILE))
}

// ==================== Engine Config ====================

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub recorder: RecorderSettings,

    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub persistence: PersistenceSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Load a config file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            RetypeError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            RetypeError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config to disk as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| RetypeError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            RetypeError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Save the config to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(CONFIG_FILE))
    }
}
