//! Error handling for retype-rs
//!
//! This module defines the error taxonomy shared by the recorder, the
//! player and the storage collaborators, plus a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for retype-rs operations
#[derive(Error, Debug)]
pub enum RetypeError {
    /// The log has no entries, so there is nothing to export or replay
    #[error("Session log is empty")]
    EmptyLog,

    /// Recording was hard-stopped because the entry cap was reached
    #[error("Entry cap of {max} reached, recording terminated")]
    CapExceeded { max: usize },

    /// A single input was longer than the allowed maximum
    #[error("Input of {len} characters exceeds the limit of {max}")]
    LengthExceeded { len: usize, max: usize },

    /// A recorded entry did not apply cleanly during replay
    #[error("Patch for entry {index} did not apply cleanly")]
    PatchApplyFailed { index: usize },

    /// Saving or fetching a log failed
    #[error("Persistence error: {0}")]
    PersistenceFailure(String),

    /// A replay was requested while another one is still running
    #[error("A replay is already in progress")]
    ReplayBusy,

    /// The replay task was cancelled before it finished
    #[error("Replay was cancelled")]
    ReplayCancelled,

    /// A session id failed validation
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport errors from the HTTP client
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed endpoint or share URL
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<RetypeError>,
    },
}

impl RetypeError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        RetypeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Strip any context wrappers and return the underlying error
    pub fn root(&self) -> &RetypeError {
        match self {
            RetypeError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error originated from the persistence collaborator
    pub fn is_persistence(&self) -> bool {
        matches!(
            self.root(),
            RetypeError::PersistenceFailure(_) | RetypeError::Http(_)
        )
    }
}

/// Result type alias for retype-rs operations
pub type Result<T> = std::result::Result<T, RetypeError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
