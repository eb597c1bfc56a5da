//! Test data builders for creating test objects

use retype_rs::config::RecorderSettings;
use retype_rs::SessionLog;

use super::manual_recorder;

/// Builder recording a typing session through a real recorder
pub struct LogBuilder {
    settings: RecorderSettings,
    start_millis: i64,
    steps: Vec<(String, i64)>,
}

impl LogBuilder {
    pub fn new() -> Self {
        Self {
            settings: RecorderSettings::default(),
            start_millis: 1_700_000_000_000,
            steps: Vec::new(),
        }
    }

    pub fn settings(mut self, settings: RecorderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Type `snapshot` `gap_ms` after the previous step
    pub fn step(mut self, snapshot: &str, gap_ms: i64) -> Self {
        self.steps.push((snapshot.to_string(), gap_ms));
        self
    }

    /// Type `text` one character at a time, `gap_ms` apart
    pub fn type_out(mut self, text: &str, gap_ms: i64) -> Self {
        let mut typed = self
            .steps
            .last()
            .map(|(snapshot, _)| snapshot.clone())
            .unwrap_or_default();
        for c in text.chars() {
            typed.push(c);
            self.steps.push((typed.clone(), gap_ms));
        }
        self
    }

    /// Run the steps and return the log with the last accepted text
    pub fn record(self) -> (SessionLog, String) {
        let (mut recorder, clock) = manual_recorder(self.settings, self.start_millis);
        for (i, (snapshot, gap)) in self.steps.iter().enumerate() {
            if i > 0 {
                clock.advance(*gap);
            }
            let _ = recorder.on_text_changed(snapshot);
        }
        (recorder.log().clone(), recorder.text().to_string())
    }

    pub fn build(self) -> SessionLog {
        self.record().0
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_builder() {
        let (log, text) = LogBuilder::new().step("a", 0).step("ab", 200).record();

        assert_eq!(log.len(), 2);
        assert_eq!(text, "ab");
        assert_eq!(log.get(1).unwrap().time_diff, 200);
    }

    #[test]
    fn test_type_out() {
        let log = LogBuilder::new().step("x", 0).type_out("yz", 30).build();
        assert_eq!(log.len(), 3);
        assert_eq!(log.reconstruct().0, "xyz");
    }
}
