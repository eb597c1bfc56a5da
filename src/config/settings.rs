//! Tunable settings for each part of the engine
//!
//! # Main Types
//!
//! - [`RecorderSettings`] - Input length limit, entry cap, session budget
//! - [`PlaybackSettings`] - Pacing floor, silent interval, timing fallback
//! - [`PersistenceSettings`] - Endpoints of the remote record store
//! - [`LoggingSettings`] - Log filter and optional log file directory
//!
//! Every field has a serde default so partial config files are accepted.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum characters accepted in a single snapshot
pub const DEFAULT_MAX_TEXT_CHARS: usize = 500;

/// Maximum entries in one recording
pub const DEFAULT_MAX_ENTRIES: usize = 1500;

/// Wall-clock budget for one recording (15 minutes)
pub const DEFAULT_SESSION_BUDGET_SECS: u32 = 15 * 60;

/// Pacing floor between visible replay steps
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 100;

/// Substitute for missing timing data on fetched logs
pub const DEFAULT_TIME_DIFF_MS: u64 = 1000;

/// Recorder limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    /// Snapshots longer than this are rejected
    pub max_text_chars: usize,
    /// Appending past this many entries terminates the session
    pub max_entries: usize,
    /// Countdown length in seconds
    pub session_budget_secs: u32,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
            max_entries: DEFAULT_MAX_ENTRIES,
            session_budget_secs: DEFAULT_SESSION_BUDGET_SECS,
        }
    }
}

/// Replay pacing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Visible replay never waits less than this between steps
    pub min_interval_ms: u64,
    /// Fixed wait between steps of a silent fast-forward
    pub silent_interval_ms: u64,
    /// Pacing assigned to fetched entries that have no timing data
    pub default_time_diff_ms: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            silent_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            default_time_diff_ms: DEFAULT_TIME_DIFF_MS,
        }
    }
}

impl PlaybackSettings {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn silent_interval(&self) -> Duration {
        Duration::from_millis(self.silent_interval_ms)
    }
}

/// Remote record store endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceSettings {
    /// Base URL of the application API (`/api/saveRecords`, `/api/checkSession`)
    pub api_base: String,
    /// Base URL of the REST table interface used for fetching
    pub rest_base: String,
    /// Anonymous API key sent with fetches
    pub api_key: Option<String>,
    /// Table holding one row per entry
    pub table: String,
    /// Column the fetched rows are ordered by
    pub order_by: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for PersistenceSettings {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:3000".to_string(),
            rest_base: "http://localhost:54321/rest/v1".to_string(),
            api_key: None,
            table: "text_records".to_string(),
            order_by: "timestamp".to_string(),
            timeout_secs: 10,
        }
    }
}

impl PersistenceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Log output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
    /// Also write daily-rolling log files here
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info,retype_rs=debug".to_string(),
            log_dir: None,
        }
    }
}
