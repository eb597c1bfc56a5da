//! Session state types

/// State of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingStatus {
    /// Waiting for the first keystroke
    #[default]
    NotStarted,
    /// Capturing keystrokes, countdown running
    Recording,
    /// Session over; further input is ignored until reset
    Stopped,
}

impl RecordingStatus {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, RecordingStatus::Recording)
    }

    /// Check if the session has ended
    pub fn is_stopped(&self) -> bool {
        matches!(self, RecordingStatus::Stopped)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            RecordingStatus::NotStarted => "Not started",
            RecordingStatus::Recording => "Recording",
            RecordingStatus::Stopped => "Stopped",
        }
    }
}

/// State of a replay player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// No replay in flight; a new one may start
    #[default]
    Idle,
    /// A replay is running
    Replaying {
        /// Whether each step is being published to observers
        visible: bool,
    },
}

impl PlayerState {
    /// Check if a replay is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self, PlayerState::Replaying { .. })
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerState::Idle => "Idle",
            PlayerState::Replaying { visible: true } => "Replaying",
            PlayerState::Replaying { visible: false } => "Fast-forwarding",
        }
    }
}

/// Why a recording session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The wall-clock budget ran out
    TimeExpired,
    /// The entry cap was hit; the log was discarded
    CapExceeded,
    /// The log was exported for saving
    Saved,
    /// The host reset the recorder mid-session
    Reset,
}

impl EndReason {
    /// Whether the recorded log was thrown away
    pub fn discards_log(&self) -> bool {
        !matches!(self, EndReason::Saved)
    }
}

/// Notifications the recorder sends to its host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The first keystroke arrived and the countdown started
    Started,
    /// One second of the budget elapsed
    Tick { remaining_secs: u32 },
    /// An input was rejected for being too long; show a warning
    InputRejected { len: usize, max: usize },
    /// The session is over and recording UI state should be reset
    Ended(EndReason),
}

/// Result of feeding one snapshot to the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// The session is stopped; the snapshot was not looked at
    Ignored,
    /// The snapshot was recorded as the entry at `index`
    Recorded { index: usize },
}
