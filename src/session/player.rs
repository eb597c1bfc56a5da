//! Timed replay of a recorded session log

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

use crate::config::PlaybackSettings;
use crate::error::{Result, RetypeError};
use crate::patch::patch_apply;
use crate::types::{PatchEntry, SessionLog};

use super::types::PlayerState;

/// Callback run once a replay finishes
pub type CompletionCallback = Box<dyn FnOnce(&ReplayReport) + Send + 'static>;

/// How a replay should run
pub struct ReplayOptions {
    visible: bool,
    on_complete: Option<CompletionCallback>,
}

impl std::fmt::Debug for ReplayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayOptions")
            .field("visible", &self.visible)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

impl ReplayOptions {
    /// Publish every step, paced by the recorded timing
    pub fn visible() -> Self {
        Self {
            visible: true,
            on_complete: None,
        }
    }

    /// Fast-forward at the silent interval without publishing
    pub fn silent() -> Self {
        Self {
            visible: false,
            on_complete: None,
        }
    }

    /// Run `callback` after the player has returned to idle
    pub fn on_complete(mut self, callback: impl FnOnce(&ReplayReport) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

/// Outcome of a finished replay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayReport {
    /// Text after the last entry
    pub text: String,
    /// Number of entries applied
    pub applied: usize,
    /// Indices of entries whose patches did not all apply cleanly
    pub failed: Vec<usize>,
    /// Whether the run was visible
    pub visible: bool,
}

impl ReplayReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// One [`RetypeError::PatchApplyFailed`] per failed entry
    pub fn errors(&self) -> Vec<RetypeError> {
        self.failed
            .iter()
            .map(|&index| RetypeError::PatchApplyFailed { index })
            .collect()
    }
}

/// Wait before applying `next`, or `None` when the run is over.
///
/// Visible runs honour the recorded gap but never go below the pacing
/// floor; silent runs use the fixed silent interval.
pub fn pause_before(
    next: Option<&PatchEntry>,
    visible: bool,
    settings: &PlaybackSettings,
) -> Option<Duration> {
    let next = next?;
    if visible {
        Some(Duration::from_millis(next.time_diff).max(settings.min_interval()))
    } else {
        Some(settings.silent_interval())
    }
}

#[derive(Debug, Default)]
struct Gate {
    state: PlayerState,
    /// Id of the most recent run
    run: u64,
    task: Option<AbortHandle>,
}

struct Shared {
    log: SessionLog,
    settings: PlaybackSettings,
    gate: Mutex<Gate>,
    text: Mutex<String>,
    cursor: AtomicUsize,
    published: watch::Sender<String>,
}

impl Shared {
    /// Return to idle if `run` is still the current one
    fn release(&self, run: u64) -> bool {
        let mut gate = self.gate.lock();
        if gate.run != run || !gate.state.is_busy() {
            return false;
        }
        gate.state = PlayerState::Idle;
        gate.task = None;
        true
    }

    /// Publish a step of `run`; dropped once the run is no longer current.
    ///
    /// The gate stays locked across the writes so a cancel followed by a new
    /// run cannot interleave with them.
    fn commit(&self, run: u64, cursor: usize, text: &str, visible: bool) -> bool {
        let gate = self.gate.lock();
        if gate.run != run || !gate.state.is_busy() {
            return false;
        }
        self.cursor.store(cursor, Ordering::SeqCst);
        {
            let mut buffer = self.text.lock();
            buffer.clear();
            buffer.push_str(text);
        }
        if visible {
            self.published.send_replace(text.to_string());
        }
        true
    }
}

/// Resets the gate if the replay task is aborted or panics
struct RunGuard {
    shared: Arc<Shared>,
    run: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.shared.release(self.run) {
            tracing::debug!(run = self.run, "Replay torn down before completion");
        }
    }
}

/// Replay player for one session log
///
/// Clones share the same state. At most one replay runs at a time.
#[derive(Clone)]
pub struct Player {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("entries", &self.shared.log.len())
            .field("state", &self.state())
            .field("cursor", &self.cursor())
            .finish()
    }
}

impl Player {
    /// Create a player for `log`; replays run on `runtime`
    pub fn new(log: SessionLog, settings: PlaybackSettings, runtime: Handle) -> Self {
        let (published, _) = watch::channel(String::new());
        Self {
            shared: Arc::new(Shared {
                log,
                settings,
                gate: Mutex::new(Gate::default()),
                text: Mutex::new(String::new()),
                cursor: AtomicUsize::new(0),
                published,
            }),
            runtime,
        }
    }

    pub fn log(&self) -> &SessionLog {
        &self.shared.log
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.shared.settings
    }

    pub fn state(&self) -> PlayerState {
        self.shared.gate.lock().state
    }

    pub fn is_busy(&self) -> bool {
        self.state().is_busy()
    }

    /// Number of entries applied by the current or last run
    pub fn cursor(&self) -> usize {
        self.shared.cursor.load(Ordering::SeqCst)
    }

    /// Buffer of the current or last run
    pub fn current_text(&self) -> String {
        self.shared.text.lock().clone()
    }

    /// Receiver for the text published by visible runs
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.shared.published.subscribe()
    }

    /// Start a replay.
    ///
    /// Fails with [`RetypeError::EmptyLog`] for an empty log and with
    /// [`RetypeError::ReplayBusy`] while another replay is in flight.
    pub fn replay(&self, options: ReplayOptions) -> Result<ReplayHandle> {
        if self.shared.log.is_empty() {
            return Err(RetypeError::EmptyLog);
        }

        let ReplayOptions {
            visible,
            on_complete,
        } = options;

        let mut gate = self.shared.gate.lock();
        if gate.state.is_busy() {
            tracing::debug!("Replay requested while another is running");
            return Err(RetypeError::ReplayBusy);
        }
        gate.run += 1;
        let run = gate.run;
        gate.state = PlayerState::Replaying { visible };

        tracing::info!(
            run,
            visible,
            entries = self.shared.log.len(),
            "Replay started"
        );

        let guard = RunGuard {
            shared: Arc::clone(&self.shared),
            run,
        };
        let task = self
            .runtime
            .spawn(run_replay(guard, visible, on_complete));
        gate.task = Some(task.abort_handle());

        Ok(ReplayHandle {
            task,
            run,
            shared: Arc::clone(&self.shared),
        })
    }

    /// Cancel whatever replay is in flight
    pub fn cancel(&self) {
        let task = {
            let mut gate = self.shared.gate.lock();
            if gate.state.is_busy() {
                tracing::info!(run = gate.run, "Replay cancelled");
                gate.state = PlayerState::Idle;
            }
            gate.task.take()
        };
        // Abort outside the gate; the task's guard takes it on drop
        if let Some(task) = task {
            task.abort();
        }
    }
}

async fn run_replay(
    guard: RunGuard,
    visible: bool,
    on_complete: Option<CompletionCallback>,
) -> ReplayReport {
    let shared = Arc::clone(&guard.shared);
    let log = &shared.log;

    let mut text = String::new();
    let mut failed = Vec::new();
    let mut applied = 0;

    let mut current = shared.commit(guard.run, 0, &text, visible);
    for (index, entry) in log.iter().enumerate() {
        if !current {
            break;
        }
        let (next, flags) = patch_apply(&entry.diffs, &text);
        if flags.iter().any(|ok| !ok) {
            tracing::warn!(
                error = %RetypeError::PatchApplyFailed { index },
                patches = flags.len(),
                "Continuing with best-effort text"
            );
            failed.push(index);
        }
        text = next;
        applied = index + 1;

        current = shared.commit(guard.run, applied, &text, visible);
        if !current {
            break;
        }
        if let Some(pause) = pause_before(log.get(index + 1), visible, &shared.settings) {
            tokio::time::sleep(pause).await;
        }
    }

    let report = ReplayReport {
        text,
        applied,
        failed,
        visible,
    };

    if !current {
        tracing::debug!(run = guard.run, applied, "Replay superseded, output dropped");
        return report;
    }

    shared.release(guard.run);
    tracing::info!(
        run = guard.run,
        applied = report.applied,
        failed = report.failed.len(),
        "Replay finished"
    );

    if let Some(callback) = on_complete {
        callback(&report);
    }
    report
}

/// Handle to one replay run
#[derive(Debug)]
pub struct ReplayHandle {
    task: JoinHandle<ReplayReport>,
    run: u64,
    shared: Arc<Shared>,
}

impl ReplayHandle {
    /// Abort this run and return the player to idle; the callback is not run
    pub fn cancel(&self) {
        {
            let mut gate = self.shared.gate.lock();
            if gate.run != self.run {
                return;
            }
            if gate.state.is_busy() {
                tracing::info!(run = self.run, "Replay cancelled");
                gate.state = PlayerState::Idle;
                gate.task = None;
            }
        }
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to finish
    pub async fn join(self) -> Result<ReplayReport> {
        match self.task.await {
            Ok(report) => Ok(report),
            Err(e) if e.is_cancelled() => Err(RetypeError::ReplayCancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

impl std::fmt::Debug for Shared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shared")
            .field("entries", &self.log.len())
            .finish_non_exhaustive()
    }
}
