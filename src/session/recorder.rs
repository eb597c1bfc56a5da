//! Keystroke recorder turning full-text snapshots into a patch log

use std::sync::{Arc, Weak};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::config::RecorderSettings;
use crate::error::{Result, RetypeError};
use crate::patch::make_patches;
use crate::types::{LogEnvelope, PatchEntry, SessionId, SessionLog};

use super::clock::Clock;
use super::countdown::spawn_countdown;
use super::types::{EndReason, Keystroke, RecordingStatus, SessionEvent};

/// Events kept for receivers; the oldest is dropped past this
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Keystroke recorder
///
/// Owns the recording session state: the last accepted text, the growing
/// log, the status and the seconds left on the countdown. It does no
/// scheduling itself; [`RecordingSession`] drives [`Recorder::tick`] from a
/// timer task.
pub struct Recorder {
    settings: RecorderSettings,
    clock: Arc<dyn Clock>,
    status: RecordingStatus,
    /// Last accepted snapshot; diffs are anchored here
    text: String,
    log: SessionLog,
    remaining_secs: u32,
    event_tx: Sender<SessionEvent>,
    event_rx: Receiver<SessionEvent>,
}

impl std::fmt::Debug for Recorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("status", &self.status)
            .field("entries", &self.log.len())
            .field("remaining_secs", &self.remaining_secs)
            .finish()
    }
}

impl Recorder {
    /// Create a new recorder
    pub fn new(settings: RecorderSettings, clock: Arc<dyn Clock>) -> Self {
        let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_QUEUE_CAPACITY);
        Self {
            remaining_secs: settings.session_budget_secs,
            settings,
            clock,
            status: RecordingStatus::NotStarted,
            text: String::new(),
            log: SessionLog::new(),
            event_tx,
            event_rx,
        }
    }

    /// Receiver for session events; clones share one bounded queue
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.event_rx.clone()
    }

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// The last accepted snapshot
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    pub fn entry_count(&self) -> usize {
        self.log.len()
    }

    /// Seconds left on the countdown
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Feed the full text after an edit.
    ///
    /// The first call starts the session. Oversized snapshots are rejected
    /// with [`RetypeError::LengthExceeded`] and leave the anchor text
    /// untouched, so the next accepted snapshot is diffed against what is
    /// actually on screen. Appending past the entry cap discards the log,
    /// stops the session and returns [`RetypeError::CapExceeded`].
    pub fn on_text_changed(&mut self, new_text: &str) -> Result<Keystroke> {
        match self.status {
            RecordingStatus::Stopped => return Ok(Keystroke::Ignored),
            RecordingStatus::NotStarted => {
                self.status = RecordingStatus::Recording;
                tracing::info!(
                    budget_secs = self.settings.session_budget_secs,
                    "Recording started"
                );
                self.emit(SessionEvent::Started);
            }
            RecordingStatus::Recording => {}
        }

        let len = new_text.chars().count();
        if len > self.settings.max_text_chars {
            let max = self.settings.max_text_chars;
            tracing::warn!(len, max, "Rejected oversized input");
            self.emit(SessionEvent::InputRejected { len, max });
            return Err(RetypeError::LengthExceeded { len, max });
        }

        if self.log.len() >= self.settings.max_entries {
            let max = self.settings.max_entries;
            tracing::warn!(max, "Entry cap reached, terminating recording");
            self.end(EndReason::CapExceeded);
            return Err(RetypeError::CapExceeded { max });
        }

        let diffs = make_patches(&self.text, new_text);
        let timestamp = self.clock.now_millis();
        let time_diff = self
            .log
            .last()
            .map(|prev| timestamp.saturating_sub(prev.timestamp).max(0) as u64)
            .unwrap_or(0);

        let index = self.log.len();
        tracing::debug!(index, time_diff, patches = diffs.len(), "Recorded entry");
        self.log.push(PatchEntry::new(diffs, timestamp, time_diff));
        self.text = new_text.to_string();

        Ok(Keystroke::Recorded { index })
    }

    /// Count one second off the budget.
    ///
    /// Returns the end reason when this tick expired the session.
    pub fn tick(&mut self) -> Option<EndReason> {
        if !self.status.is_recording() {
            return None;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.emit(SessionEvent::Tick {
            remaining_secs: self.remaining_secs,
        });

        if self.remaining_secs == 0 {
            tracing::info!(entries = self.log.len(), "Recording time expired");
            self.end(EndReason::TimeExpired);
            return Some(EndReason::TimeExpired);
        }
        None
    }

    /// Hand over the finished log under a fresh session id.
    ///
    /// Fails with [`RetypeError::EmptyLog`] and changes nothing when no
    /// entry has been recorded.
    pub fn finalize_and_export(&mut self) -> Result<LogEnvelope> {
        if self.log.is_empty() {
            return Err(RetypeError::EmptyLog);
        }

        let records = std::mem::take(&mut self.log);
        let envelope = LogEnvelope::new(SessionId::generate(), records);
        tracing::info!(
            session_id = %envelope.session_id,
            entries = envelope.records.len(),
            "Recording exported"
        );
        self.end(EndReason::Saved);
        Ok(envelope)
    }

    /// Return to a fresh, not-started session
    pub fn reset(&mut self) {
        if self.status.is_recording() {
            self.emit(SessionEvent::Ended(EndReason::Reset));
        }
        self.status = RecordingStatus::NotStarted;
        self.text.clear();
        self.log.clear();
        self.remaining_secs = self.settings.session_budget_secs;
    }

    fn end(&mut self, reason: EndReason) {
        if reason.discards_log() {
            self.log.clear();
            self.text.clear();
        }
        self.status = RecordingStatus::Stopped;
        self.emit(SessionEvent::Ended(reason));
    }

    fn emit(&self, event: SessionEvent) {
        // The recorder holds a receiver, so the channel never disconnects
        if let Err(TrySendError::Full(event)) = self.event_tx.try_send(event) {
            let _ = self.event_rx.try_recv();
            tracing::trace!("Session event queue full, dropped oldest event");
            let _ = self.event_tx.try_send(event);
        }
    }
}

/// A recorder with its countdown driven on a tokio runtime
///
/// The countdown task starts with the first keystroke and is aborted on
/// every teardown path: cap exceeded, export, reset and drop.
pub struct RecordingSession {
    recorder: Arc<Mutex<Recorder>>,
    countdown: Mutex<Option<JoinHandle<()>>>,
    runtime: Handle,
    tick_period: Duration,
}

impl RecordingSession {
    /// Create a session whose countdown runs on `runtime`
    pub fn new(settings: RecorderSettings, clock: Arc<dyn Clock>, runtime: Handle) -> Self {
        Self {
            recorder: Arc::new(Mutex::new(Recorder::new(settings, clock))),
            countdown: Mutex::new(None),
            runtime,
            tick_period: Duration::from_secs(1),
        }
    }

    /// Receiver for session events
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.recorder.lock().events()
    }

    pub fn status(&self) -> RecordingStatus {
        self.recorder.lock().status()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.recorder.lock().remaining_secs()
    }

    pub fn text(&self) -> String {
        self.recorder.lock().text().to_string()
    }

    pub fn entry_count(&self) -> usize {
        self.recorder.lock().entry_count()
    }

    /// Copy of the log recorded so far
    pub fn log(&self) -> SessionLog {
        self.recorder.lock().log().clone()
    }

    /// Feed the full text after an edit; see [`Recorder::on_text_changed`]
    pub fn on_text_changed(&self, new_text: &str) -> Result<Keystroke> {
        let (started, result, stopped) = {
            let mut recorder = self.recorder.lock();
            let before = recorder.status();
            let result = recorder.on_text_changed(new_text);
            let after = recorder.status();
            (
                before == RecordingStatus::NotStarted && after.is_recording(),
                result,
                after.is_stopped(),
            )
        };

        if started {
            self.start_countdown();
        }
        if stopped {
            self.cancel_countdown();
        }
        result
    }

    /// Export the log; see [`Recorder::finalize_and_export`]
    pub fn finalize_and_export(&self) -> Result<LogEnvelope> {
        let envelope = self.recorder.lock().finalize_and_export()?;
        self.cancel_countdown();
        Ok(envelope)
    }

    /// Tear the session down and return to not-started
    pub fn reset(&self) {
        self.cancel_countdown();
        self.recorder.lock().reset();
    }

    fn start_countdown(&self) {
        let weak: Weak<Mutex<Recorder>> = Arc::downgrade(&self.recorder);
        let task = spawn_countdown(&self.runtime, weak, self.tick_period);
        if let Some(previous) = self.countdown.lock().replace(task) {
            previous.abort();
        }
    }

    fn cancel_countdown(&self) {
        if let Some(task) = self.countdown.lock().take() {
            task.abort();
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.cancel_countdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;

    fn recorder_with(settings: RecorderSettings) -> (Recorder, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (Recorder::new(settings, clock.clone()), clock)
    }

    fn recorder() -> (Recorder, Arc<ManualClock>) {
        recorder_with(RecorderSettings::default())
    }

    #[test]
    fn test_first_keystroke_starts_recording() {
        let (mut recorder, _) = recorder();
        assert_eq!(recorder.status(), RecordingStatus::NotStarted);

        let outcome = recorder.on_text_changed("a").unwrap();
        assert_eq!(outcome, Keystroke::Recorded { index: 0 });
        assert_eq!(recorder.status(), RecordingStatus::Recording);
        assert_eq!(recorder.events().try_recv(), Ok(SessionEvent::Started));
    }

    #[test]
    fn test_time_diffs() {
        let (mut recorder, clock) = recorder();
        recorder.on_text_changed("a").unwrap();
        clock.advance(200);
        recorder.on_text_changed("ab").unwrap();
        clock.advance(50);
        recorder.on_text_changed("abc").unwrap();

        let diffs: Vec<u64> = recorder.log().iter().map(|e| e.time_diff).collect();
        assert_eq!(diffs, vec![0, 200, 50]);
        assert_eq!(recorder.log().get(0).unwrap().timestamp, 1_000);
        assert_eq!(recorder.log().reconstruct().0, "abc");
    }

    #[test]
    fn test_oversized_input_keeps_anchor() {
        let (mut recorder, _) = recorder();
        recorder.on_text_changed("hello").unwrap();

        let long = "x".repeat(501);
        let err = recorder.on_text_changed(&long).unwrap_err();
        assert!(matches!(err, RetypeError::LengthExceeded { len: 501, max: 500 }));
        assert_eq!(recorder.text(), "hello");
        assert_eq!(recorder.entry_count(), 1);

        // Next accepted snapshot is diffed against "hello", so replay stays exact
        recorder.on_text_changed("hello!").unwrap();
        assert_eq!(recorder.log().reconstruct(), ("hello!".to_string(), vec![]));
    }

    #[test]
    fn test_exactly_max_length_is_accepted() {
        let (mut recorder, _) = recorder();
        let text = "あ".repeat(500);
        assert!(recorder.on_text_changed(&text).is_ok());
    }

    #[test]
    fn test_oversized_first_input_still_starts_session() {
        let (mut recorder, _) = recorder();
        let events = recorder.events();
        assert!(recorder.on_text_changed(&"x".repeat(600)).is_err());
        assert_eq!(recorder.status(), RecordingStatus::Recording);
        assert_eq!(events.try_recv(), Ok(SessionEvent::Started));
        assert_eq!(
            events.try_recv(),
            Ok(SessionEvent::InputRejected { len: 600, max: 500 })
        );
    }

    #[test]
    fn test_cap_exceeded_terminates() {
        let (mut recorder, _) = recorder_with(RecorderSettings {
            max_entries: 3,
            ..Default::default()
        });
        for text in ["a", "ab", "abc"] {
            recorder.on_text_changed(text).unwrap();
        }
        assert_eq!(recorder.entry_count(), 3);

        let err = recorder.on_text_changed("abcd").unwrap_err();
        assert!(matches!(err, RetypeError::CapExceeded { max: 3 }));
        assert_eq!(recorder.status(), RecordingStatus::Stopped);
        assert_eq!(recorder.entry_count(), 0);

        // Stopped sessions ignore input
        assert_eq!(recorder.on_text_changed("x").unwrap(), Keystroke::Ignored);
        assert!(recorder
            .events()
            .try_iter()
            .any(|e| e == SessionEvent::Ended(EndReason::CapExceeded)));
    }

    #[test]
    fn test_countdown_expiry() {
        let (mut recorder, _) = recorder_with(RecorderSettings {
            session_budget_secs: 3,
            ..Default::default()
        });
        assert_eq!(recorder.tick(), None, "no countdown before first keystroke");
        assert_eq!(recorder.remaining_secs(), 3);

        recorder.on_text_changed("a").unwrap();
        assert_eq!(recorder.tick(), None);
        assert_eq!(recorder.tick(), None);
        assert_eq!(recorder.tick(), Some(EndReason::TimeExpired));
        assert_eq!(recorder.status(), RecordingStatus::Stopped);
        assert!(recorder.log().is_empty());
        assert_eq!(recorder.tick(), None);
    }

    #[test]
    fn test_undrained_events_stay_bounded() {
        let (mut recorder, _) = recorder_with(RecorderSettings {
            session_budget_secs: 900,
            ..Default::default()
        });
        let events = recorder.events();
        for _ in 0..10 {
            recorder.on_text_changed("a").unwrap();
            while recorder.tick().is_none() {}
            recorder.reset();
        }

        assert_eq!(events.len(), EVENT_QUEUE_CAPACITY);
        // The newest events survive
        let last = events.try_iter().last();
        assert_eq!(last, Some(SessionEvent::Ended(EndReason::TimeExpired)));
    }

    #[test]
    fn test_finalize_and_export() {
        let (mut recorder, _) = recorder();
        recorder.on_text_changed("hi").unwrap();

        let envelope = recorder.finalize_and_export().unwrap();
        assert_eq!(envelope.records.len(), 1);
        assert!(envelope.session_id.as_str().starts_with('_'));
        assert_eq!(recorder.status(), RecordingStatus::Stopped);
        assert!(recorder
            .events()
            .try_iter()
            .any(|e| e == SessionEvent::Ended(EndReason::Saved)));
    }

    #[test]
    fn test_export_empty_log_changes_nothing() {
        let (mut recorder, _) = recorder();
        assert!(matches!(
            recorder.finalize_and_export(),
            Err(RetypeError::EmptyLog)
        ));
        assert_eq!(recorder.status(), RecordingStatus::NotStarted);
        assert!(recorder.events().try_recv().is_err());
    }

    #[test]
    fn test_reset() {
        let (mut recorder, _) = recorder_with(RecorderSettings {
            session_budget_secs: 10,
            ..Default::default()
        });
        recorder.on_text_changed("abc").unwrap();
        recorder.tick();
        recorder.reset();

        assert_eq!(recorder.status(), RecordingStatus::NotStarted);
        assert_eq!(recorder.text(), "");
        assert_eq!(recorder.remaining_secs(), 10);
        assert!(recorder.log().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_countdown_runs_on_runtime() {
        let session = RecordingSession::new(
            RecorderSettings {
                session_budget_secs: 2,
                ..Default::default()
            },
            Arc::new(ManualClock::new(0)),
            Handle::current(),
        );
        let events = session.events();
        session.on_text_changed("a").unwrap();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(session.remaining_secs(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(session.status(), RecordingStatus::Stopped);
        let seen: Vec<_> = events.try_iter().collect();
        assert_eq!(
            seen,
            vec![
                SessionEvent::Started,
                SessionEvent::Tick { remaining_secs: 1 },
                SessionEvent::Tick { remaining_secs: 0 },
                SessionEvent::Ended(EndReason::TimeExpired),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_export_cancels_countdown() {
        let session = RecordingSession::new(
            RecorderSettings {
                session_budget_secs: 2,
                ..Default::default()
            },
            Arc::new(ManualClock::new(0)),
            Handle::current(),
        );
        session.on_text_changed("a").unwrap();
        let envelope = session.finalize_and_export().unwrap();
        assert_eq!(envelope.records.len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(session.remaining_secs(), 2);
    }
}
