//! Integration tests for saving, sharing and reopening sessions

mod common;

use std::sync::Arc;

use common::mock_helpers::UnreachableStore;
use retype_rs::app::stash_recording;
use retype_rs::config::{PlaybackSettings, RecorderSettings};
use retype_rs::session::{ManualClock, RecordingStatus};
use retype_rs::share::session_from_link;
use retype_rs::storage::{FileKeyValueStore, LocalLogStore};
use retype_rs::{
    submit_recording, LogSource, MemoryRecordStore, PlaybackController, RecordStore,
    RecordingSession, RetypeError,
};
use tokio::runtime::Handle;
use url::Url;

fn origin() -> Url {
    Url::parse("http://localhost:3000").unwrap()
}

fn session(clock: Arc<ManualClock>) -> RecordingSession {
    RecordingSession::new(RecorderSettings::default(), clock, Handle::current())
}

#[tokio::test(start_paused = true)]
async fn test_submit_then_open_remote() {
    let store = Arc::new(MemoryRecordStore::new());
    let local = LocalLogStore::in_memory();
    let clock = Arc::new(ManualClock::new(0));
    let recording = session(clock.clone());

    for text in ["w", "wo", "wor", "word"] {
        clock.advance(120);
        recording.on_text_changed(text).unwrap();
    }
    let envelope = submit_recording(&recording, store.as_ref(), &local)
        .await
        .unwrap();
    assert_eq!(recording.status(), RecordingStatus::Stopped);
    assert!(store.exists(&envelope.session_id).await.unwrap());

    let mut controller = PlaybackController::new(
        store.clone(),
        local,
        PlaybackSettings::default(),
        origin(),
        Handle::current(),
    );
    controller
        .open(LogSource::Remote(envelope.session_id.clone()))
        .await
        .unwrap();

    // Fetch boundary gave the first entry the default gap
    assert_eq!(controller.log().unwrap().get(0).unwrap().time_diff, 1000);

    let report = controller.start().await.unwrap();
    assert_eq!(report.text, "word");

    let link = controller.share_link().unwrap().clone();
    assert_eq!(session_from_link(&link).unwrap(), envelope.session_id);
}

#[tokio::test(start_paused = true)]
async fn test_local_log_is_shared_once() {
    let store = Arc::new(MemoryRecordStore::new());
    let dir = tempfile::tempdir().unwrap();
    let kv = Arc::new(FileKeyValueStore::open(dir.path().join("local_store.json")).unwrap());
    let local = LocalLogStore::new(kv);

    let clock = Arc::new(ManualClock::new(0));
    let recording = session(clock.clone());
    recording.on_text_changed("draft").unwrap();
    clock.advance(400);
    recording.on_text_changed("draft 2").unwrap();
    assert_eq!(stash_recording(&recording, &local).unwrap(), 2);

    let mut controller = PlaybackController::new(
        store.clone(),
        local.clone(),
        PlaybackSettings::default(),
        origin(),
        Handle::current(),
    );
    controller.open(LogSource::Local).await.unwrap();
    assert_eq!(controller.start().await.unwrap().text, "draft 2");

    let link = controller.share().await.unwrap();
    let id = session_from_link(&link).unwrap();
    assert_eq!(store.raw(&id).unwrap(), local.load_log().unwrap());
    assert_eq!(store.len(), 1);

    // Reopening the shared session replays the stored copy
    controller.open(LogSource::Remote(id)).await.unwrap();
    let handle = controller.replay().unwrap();
    assert_eq!(handle.join().await.unwrap().text, "draft 2");
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_backend() {
    let store = Arc::new(UnreachableStore::new());
    let local = LocalLogStore::in_memory();
    let recording = session(Arc::new(ManualClock::new(0)));
    recording.on_text_changed("lost?").unwrap();

    let err = submit_recording(&recording, store.as_ref(), &local)
        .await
        .unwrap_err();
    assert!(err.is_persistence());
    assert_eq!(local.load_log().unwrap().reconstruct().0, "lost?");

    let mut controller = PlaybackController::new(
        store.clone(),
        local,
        PlaybackSettings::default(),
        origin(),
        Handle::current(),
    );
    let err = controller
        .open(LogSource::Remote(retype_rs::SessionId::generate()))
        .await
        .unwrap_err();
    assert!(err.is_persistence());

    // Existence check failures fall through to saving, which then fails
    controller.open(LogSource::Local).await.unwrap();
    let err = controller.share().await.unwrap_err();
    assert!(matches!(err.root(), RetypeError::PersistenceFailure(_)));
    assert_eq!(store.calls(), 4);
}
