//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use std::sync::Arc;
use std::time::Duration;

use retype_rs::config::RecorderSettings;
use retype_rs::session::{ManualClock, Recorder};

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_secs(5)
}

/// A recorder on a manual clock starting at `start_millis`
pub fn manual_recorder(settings: RecorderSettings, start_millis: i64) -> (Recorder, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start_millis));
    (Recorder::new(settings, clock.clone()), clock)
}

/// A current-thread runtime with paused time, for use outside `#[tokio::test]`
pub fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("failed to build test runtime")
}
