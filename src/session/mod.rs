//! Session recording and playback module
//!
//! This module records typing sessions as a log of text patches and plays
//! them back later with the original rhythm.
//!
//! # Features
//!
//! - Record full-text snapshots as compact patch entries with timing
//! - Enforce the input length limit, entry cap and countdown budget
//! - Replay a log visibly, paced by the recorded gaps with a floor
//! - Fast-forward a log silently to reach its final text
//! - Cancel a replay in flight

pub mod clock;
pub mod countdown;
pub mod player;
pub mod recorder;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use player::{
    pause_before, CompletionCallback, Player, ReplayHandle, ReplayOptions, ReplayReport,
};
pub use recorder::{Recorder, RecordingSession, EVENT_QUEUE_CAPACITY};
pub use types::{EndReason, Keystroke, PlayerState, RecordingStatus, SessionEvent};
