//! Elapsed-time ticker for started jobs
//!
//! While a job is started the UI shows how long the crew has been on site.
//! `ElapsedTicker` recomputes that once per interval on a background thread
//! and hands it to a callback. Stopping is cooperative: an atomic flag plus
//! an unpark, then the thread is joined.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default refresh interval
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Callback receiving the elapsed time on each tick
pub type TickCallback = Arc<dyn Fn(Duration) + Send + Sync>;

/// Time since `start`, zero if `start` is in the future
pub fn elapsed_since(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - start).to_std().unwrap_or(Duration::ZERO)
}

/// Render as `HH:MM:SS`. Hours keep growing past 99.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Background thread that reports elapsed time until stopped
#[derive(Debug)]
pub struct ElapsedTicker {
    job_id: String,
    start: DateTime<Utc>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ElapsedTicker {
    /// Spawn the ticker. The callback fires immediately, then once per
    /// `interval`.
    pub fn start(job_id: &str, start: DateTime<Utc>, interval: Duration, on_tick: TickCallback) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let thread = thread::spawn(move || {
            while !flag.load(Ordering::SeqCst) {
                on_tick(elapsed_since(start, Utc::now()));
                thread::park_timeout(interval);
            }
        });
        Self {
            job_id: job_id.to_string(),
            start,
            stop,
            thread: Some(thread),
        }
    }

    /// Whether this ticker is counting from `start` for `job_id`
    pub fn tracks(&self, job_id: &str, start: DateTime<Utc>) -> bool {
        self.job_id == job_id && self.start == start
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop and join the thread. Safe to call more than once.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            thread.thread().unpark();
            let _ = thread.join();
        }
    }
}

impl Drop for ElapsedTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::ZERO), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(100 * 3600 + 1)), "100:00:01");
    }

    #[test]
    fn test_elapsed_since_future_start_is_zero() {
        let now = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
        assert_eq!(elapsed_since(later, now), Duration::ZERO);
        assert_eq!(elapsed_since(now, later), Duration::from_secs(1800));
    }

    #[test]
    fn test_ticker_reports_and_stops() {
        let seen: Arc<Mutex<Vec<Duration>>> = Arc::default();
        let sink = seen.clone();
        let start = Utc::now() - chrono::Duration::seconds(90);

        let mut ticker = ElapsedTicker::start(
            "j1",
            start,
            Duration::from_millis(10),
            Arc::new(move |d| sink.lock().unwrap().push(d)),
        );
        thread::sleep(Duration::from_millis(50));
        ticker.stop();
        assert!(!ticker.is_running());

        let count = seen.lock().unwrap().len();
        assert!(count >= 1);
        assert!(seen.lock().unwrap()[0] >= Duration::from_secs(90));

        thread::sleep(Duration::from_millis(30));
        assert_eq!(seen.lock().unwrap().len(), count);
    }

    #[test]
    fn test_tracks() {
        let start = Utc::now();
        let ticker = ElapsedTicker::start("j1", start, Duration::from_secs(1), Arc::new(|_| {}));
        assert!(ticker.tracks("j1", start));
        assert!(!ticker.tracks("j2", start));
    }
}
