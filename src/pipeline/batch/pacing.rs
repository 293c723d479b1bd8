use std::sync::Mutex;
use std::time::Duration;

/// Blocks between documents to stay under the LLM request budget.
pub trait Pacer {
    fn pause(&self, duration: Duration);
}

/// Sleeps the calling thread.
pub struct ThreadSleepPacer;

impl Pacer for ThreadSleepPacer {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested pauses without sleeping (for tests and dry runs).
#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Duration>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&self, duration: Duration) {
        if let Ok(mut pauses) = self.pauses.lock() {
            pauses.push(duration);
        }
    }
}

impl<P: Pacer + ?Sized> Pacer for std::sync::Arc<P> {
    fn pause(&self, duration: Duration) {
        (**self).pause(duration);
    }
}
