// Timestamped stage logging

use std::time::{Duration, Instant};

use chrono::Local;
use log::info;

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// `[HH:MM:SS] message`
pub fn stage_line(message: &str) -> String {
    format!("[{}] {}", timestamp(), message)
}

/// `[HH:MM:SS] message (1.23s)`
pub fn elapsed_line(message: &str, elapsed: Duration) -> String {
    format!("[{}] {} ({:.2}s)", timestamp(), message, elapsed.as_secs_f64())
}

pub fn log_line(message: &str) {
    info!("{}", stage_line(message));
}

/// Times a pipeline stage and reports how long it took when dropped.
///
/// Use [`StageTimer::finish`] when the completion message depends on what the
/// stage produced; otherwise the label given at start is reported. A stage that
/// failed is [abandoned](StageTimer::abandon) and reports nothing.
pub struct StageTimer {
    label: String,
    started_at: Instant,
    reported: bool,
}

impl StageTimer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started_at: Instant::now(),
            reported: false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Report the stage with a custom completion message
    pub fn finish(mut self, message: &str) -> Duration {
        let elapsed = self.elapsed();
        info!("{}", elapsed_line(message, elapsed));
        self.reported = true;
        elapsed
    }

    /// Stop without reporting, for stages that did not complete
    pub fn abandon(&mut self) {
        self.reported = true;
    }

    /// Line reported when the timer is dropped, if any
    fn completion_line(&self) -> Option<String> {
        (!self.reported).then(|| elapsed_line(&self.label, self.elapsed()))
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if let Some(line) = self.completion_line() {
            info!("{}", line);
        }
    }
}
