use std::sync::mpsc::Sender;
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchEvent {
    Log(String),
    Progress {
        done: usize,
        total: usize,
        eta: String,
    },
    TrackProgress {
        window: usize,
        windows: usize,
    },
}

/// Receives log lines and progress from the batch worker.
///
/// Callbacks are advisory: they must not block for long and cannot fail the batch.
pub trait BatchObserver {
    fn on_log(&mut self, line: &str);

    fn on_progress(&mut self, done: usize, total: usize, eta: &str);

    fn on_track_progress(&mut self, _window: usize, _windows: usize) {}
}

impl BatchObserver for Sender<BatchEvent> {
    // A closed receiver only means nobody is watching anymore.
    fn on_log(&mut self, line: &str) {
        let _ = self.send(BatchEvent::Log(line.to_string()));
    }

    fn on_progress(&mut self, done: usize, total: usize, eta: &str) {
        let _ = self.send(BatchEvent::Progress {
            done,
            total,
            eta: eta.to_string(),
        });
    }

    fn on_track_progress(&mut self, window: usize, windows: usize) {
        let _ = self.send(BatchEvent::TrackProgress { window, windows });
    }
}

impl BatchObserver for Vec<BatchEvent> {
    fn on_log(&mut self, line: &str) {
        self.push(BatchEvent::Log(line.to_string()));
    }

    fn on_progress(&mut self, done: usize, total: usize, eta: &str) {
        self.push(BatchEvent::Progress {
            done,
            total,
            eta: eta.to_string(),
        });
    }

    fn on_track_progress(&mut self, window: usize, windows: usize) {
        self.push(BatchEvent::TrackProgress { window, windows });
    }
}

/// Average time per completed file times the files still pending.
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Duration {
    if completed == 0 {
        return Duration::ZERO;
    }
    let remaining = total.saturating_sub(completed) as u32;
    (elapsed / completed as u32) * remaining
}

/// `MM:SS`, minutes keep growing past an hour.
pub fn format_clock(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `H:MM:SS`.
pub fn format_hms(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn format_eta(remaining: Duration) -> String {
    format!("Est. time left: {}", format_clock(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn eta_uses_average_per_file() {
        let eta = estimate_remaining(Duration::from_secs(30), 3, 10);
        assert_eq!(eta, Duration::from_secs(70));
        assert_eq!(estimate_remaining(Duration::from_secs(30), 10, 10), Duration::ZERO);
        assert_eq!(estimate_remaining(Duration::from_secs(5), 0, 10), Duration::ZERO);
    }

    #[test]
    fn clock_formats() {
        assert_eq!(format_clock(Duration::from_secs(75)), "01:15");
        assert_eq!(format_clock(Duration::from_secs(3_725)), "62:05");
        assert_eq!(format_hms(Duration::from_secs(3_725)), "1:02:05");
        assert_eq!(format_hms(Duration::from_millis(900)), "0:00:00");
        assert_eq!(format_eta(Duration::from_secs(61)), "Est. time left: 01:01");
    }

    #[test]
    fn sender_observer_survives_closed_receiver() {
        let (mut tx, rx) = mpsc::channel();
        tx.on_log("first");
        assert_eq!(rx.recv().unwrap(), BatchEvent::Log("first".into()));
        drop(rx);
        tx.on_progress(1, 2, "Est. time left: 00:01");
        tx.on_track_progress(1, 4);
    }
}
