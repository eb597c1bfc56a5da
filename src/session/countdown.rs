//! Countdown task driving [`Recorder::tick`] once per period

use std::sync::Weak;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::recorder::Recorder;

/// Spawn the countdown on `runtime`.
///
/// The first tick fires one period after spawning. The task exits on its own
/// once the recorder is dropped or stops recording.
pub fn spawn_countdown(
    runtime: &Handle,
    recorder: Weak<Mutex<Recorder>>,
    period: Duration,
) -> JoinHandle<()> {
    runtime.spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let Some(recorder) = recorder.upgrade() else {
                tracing::trace!("Recorder dropped, countdown exiting");
                break;
            };
            let mut recorder = recorder.lock();
            if !recorder.status().is_recording() {
                break;
            }
            if recorder.tick().is_some() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecorderSettings;
    use crate::session::clock::ManualClock;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_countdown_exits_when_recorder_dropped() {
        let recorder = Arc::new(Mutex::new(Recorder::new(
            RecorderSettings::default(),
            Arc::new(ManualClock::new(0)),
        )));
        recorder.lock().on_text_changed("a").unwrap();

        let task = spawn_countdown(
            &Handle::current(),
            Arc::downgrade(&recorder),
            Duration::from_secs(1),
        );
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(recorder.lock().remaining_secs(), 900 - 2);

        drop(recorder);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(task.is_finished());
    }
}
