//! Host-facing flows tying the recorder, the player and storage together
//!
//! [`submit_recording`] hands a finished recording to a [`RecordStore`].
//! [`PlaybackController`] drives the playback page: open a log, fast-forward
//! it silently, replay it visibly and produce a share link.

use std::sync::Arc;

use tokio::runtime::Handle;
use url::Url;

use crate::config::PlaybackSettings;
use crate::error::{Result, ResultExt, RetypeError};
use crate::session::{Player, RecordingSession, ReplayHandle, ReplayOptions, ReplayReport};
use crate::share::share_link;
use crate::storage::{LocalLogStore, RecordStore};
use crate::types::{LogEnvelope, SessionId, SessionLog};

/// Fresh ids tried before giving up on finding an unused one
pub const SESSION_ID_ATTEMPTS: usize = 3;

/// Format of the first-playback marker
const PLAYBACK_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Export the recording and save it under its new session id.
///
/// When saving fails the exported log is kept in `local` so it can still be
/// replayed and shared later.
pub async fn submit_recording(
    session: &RecordingSession,
    store: &dyn RecordStore,
    local: &LocalLogStore,
) -> Result<LogEnvelope> {
    let envelope = session.finalize_and_export()?;

    if let Err(e) = store.save(&envelope.session_id, &envelope.records).await {
        tracing::error!(session_id = %envelope.session_id, "Failed to save recording: {}", e);
        local
            .save_log(&envelope.records)
            .context("Failed to keep unsaved recording locally")?;
        return Err(e.with_context("Failed to save recording"));
    }

    Ok(envelope)
}

/// Keep the log recorded so far as the unsaved local log
pub fn stash_recording(session: &RecordingSession, local: &LocalLogStore) -> Result<usize> {
    let log = session.log();
    local.save_log(&log)?;
    Ok(log.len())
}

/// Where the playback page loads its log from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSource {
    /// A persisted session
    Remote(SessionId),
    /// The unsaved local log
    Local,
}

/// State behind the playback page
pub struct PlaybackController {
    store: Arc<dyn RecordStore>,
    local: LocalLogStore,
    settings: PlaybackSettings,
    origin: Url,
    runtime: Handle,
    player: Option<Player>,
    session_id: Option<SessionId>,
    share_link: Option<Url>,
    first_playback: Option<String>,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("origin", &self.origin.as_str())
            .field("session_id", &self.session_id)
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}

impl PlaybackController {
    pub fn new(
        store: Arc<dyn RecordStore>,
        local: LocalLogStore,
        settings: PlaybackSettings,
        origin: Url,
        runtime: Handle,
    ) -> Self {
        Self {
            store,
            local,
            settings,
            origin,
            runtime,
            player: None,
            session_id: None,
            share_link: None,
            first_playback: None,
        }
    }

    /// Load a log and build its player.
    ///
    /// Remote logs also get their share link and first-playback marker.
    pub async fn open(&mut self, source: LogSource) -> Result<&Player> {
        self.teardown();

        let log = match &source {
            LogSource::Remote(id) => self
                .store
                .fetch_by_session(id)
                .await
                .with_context(|| format!("Failed to fetch session {}", id))?,
            LogSource::Local => self.local.load_log()?,
        };
        tracing::info!(?source, entries = log.len(), "Opened log for playback");

        let mut first_playback = None;
        if let LogSource::Remote(id) = &source {
            self.share_link = Some(share_link(&self.origin, id)?);
            first_playback = self.local.first_playback(id)?;
            if first_playback.is_none() {
                let now = playback_time_now();
                self.local.mark_first_playback(id, &now)?;
                first_playback = Some(now);
            }
            self.session_id = Some(id.clone());
        }
        self.first_playback = Some(first_playback.unwrap_or_else(playback_time_now));

        let player = Player::new(log, self.settings.clone(), self.runtime.clone());
        Ok(&*self.player.insert(player))
    }

    /// The silent fast-forward followed by the first visible replay
    pub async fn start(&self) -> Result<ReplayReport> {
        let player = self.player()?;
        player.replay(ReplayOptions::silent())?.join().await?;
        player.replay(ReplayOptions::visible())?.join().await
    }

    /// Start another visible replay
    pub fn replay(&self) -> Result<ReplayHandle> {
        self.player()?.replay(ReplayOptions::visible())
    }

    /// Persist the unsaved local log under a fresh id and link to it.
    ///
    /// A log opened from a session is already shared, so its existing link
    /// is returned unchanged.
    pub async fn share(&mut self) -> Result<Url> {
        if let Some(link) = &self.share_link {
            return Ok(link.clone());
        }

        let session_id = self.unused_session_id().await?;
        let log = self.local.load_log()?;
        if !log.is_empty() {
            self.store
                .save(&session_id, &log)
                .await
                .context("Failed to save shared log")?;
        }

        let link = share_link(&self.origin, &session_id)?;
        let now = playback_time_now();
        self.local.mark_first_playback(&session_id, &now)?;
        tracing::info!(%session_id, %link, entries = log.len(), "Shared log");

        self.session_id = Some(session_id);
        self.share_link = Some(link.clone());
        Ok(link)
    }

    async fn unused_session_id(&self) -> Result<SessionId> {
        for _ in 0..SESSION_ID_ATTEMPTS {
            let candidate = SessionId::generate();
            match self.store.exists(&candidate).await {
                Ok(false) => return Ok(candidate),
                Ok(true) => {
                    tracing::warn!(session_id = %candidate, "Generated session id is taken");
                }
                Err(e) => {
                    tracing::warn!("Session id check failed, assuming unused: {}", e);
                    return Ok(candidate);
                }
            }
        }
        Err(RetypeError::PersistenceFailure(format!(
            "No unused session id after {} attempts",
            SESSION_ID_ATTEMPTS
        )))
    }

    pub fn player(&self) -> Result<&Player> {
        self.player.as_ref().ok_or(RetypeError::EmptyLog)
    }

    /// The log behind the current player
    pub fn log(&self) -> Option<&SessionLog> {
        self.player.as_ref().map(Player::log)
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn share_link(&self) -> Option<&Url> {
        self.share_link.as_ref()
    }

    /// When this log was first played back, as shown on the page
    pub fn first_playback(&self) -> Option<&str> {
        self.first_playback.as_deref()
    }

    /// Cancel any replay and forget the opened log
    pub fn teardown(&mut self) {
        if let Some(player) = self.player.take() {
            player.cancel();
        }
        self.session_id = None;
        self.share_link = None;
        self.first_playback = None;
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Some(player) = &self.player {
            player.cancel();
        }
    }
}

fn playback_time_now() -> String {
    chrono::Local::now().format(PLAYBACK_TIME_FORMAT).to_string()
}
