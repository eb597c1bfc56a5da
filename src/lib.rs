//! # retype-rs: Keystroke Delta Recorder and Timed Replay
//!
//! Records the evolution of a text buffer as a log of text patches, one per
//! edit, each stamped with the time since the previous edit. The log can be
//! replayed later to reproduce the typing with its original rhythm.
//!
//! ## Architecture
//!
//! - **Recorder**: Diffs each snapshot against the last accepted one and
//!   enforces the input limit, entry cap and countdown budget
//! - **Player**: Applies the log in order on a tokio task, pacing visible
//!   runs by the recorded gaps with a floor
//! - **Patch engine**: Diff, semantic cleanup, context patches and
//!   best-effort application (`similar` underneath)
//! - **Storage**: Injected record stores (HTTP, in-memory) and a local
//!   key-value store for the unsaved log
//!
//! ## Configuration
//!
//! Engine settings are stored in `retype.toml` in the platform-appropriate
//! data directory under `dev.retype.retype-rs`:
//!
//! - **Linux**: `~/.local/share/dev.retype.retype-rs/`
//! - **macOS**: `~/Library/Application Support/dev.retype.retype-rs/`
//! - **Windows**: `%APPDATA%\dev.retype.retype-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use retype_rs::{
//!     config::EngineConfig,
//!     session::{Player, RecordingSession, ReplayOptions, SystemClock},
//! };
//!
//! #[tokio::main]
//! async fn main() -> retype_rs::Result<()> {
//!     let config = EngineConfig::load_or_default();
//!     let _guard = retype_rs::logging::init(&config.logging)?;
//!
//!     let session = RecordingSession::new(
//!         config.recorder.clone(),
//!         Arc::new(SystemClock),
//!         tokio::runtime::Handle::current(),
//!     );
//!     session.on_text_changed("h")?;
//!     session.on_text_changed("hi")?;
//!
//!     let envelope = session.finalize_and_export()?;
//!     let player = Player::new(
//!         envelope.records,
//!         config.playback.clone(),
//!         tokio::runtime::Handle::current(),
//!     );
//!     let report = player.replay(ReplayOptions::visible())?.join().await?;
//!     assert_eq!(report.text, "hi");
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod patch;
pub mod session;
pub mod share;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use app::{submit_recording, LogSource, PlaybackController};
pub use config::EngineConfig;
pub use error::{Result, RetypeError};
pub use session::{Player, RecordingSession, ReplayOptions, ReplayReport};
pub use storage::{HttpRecordStore, MemoryRecordStore, RecordStore};
pub use types::{LogEnvelope, PatchEntry, SessionId, SessionLog};
