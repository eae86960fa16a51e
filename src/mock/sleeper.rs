//! Sleeper that records instead of waiting.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::tail::Sleeper;

/// Records every requested delay and returns immediately.
///
/// Optionally raises a stop flag once a number of sleeps have been seen, so a
/// follow-mode loop can be driven for a bounded number of iterations.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
    stop_after: Option<StopAfter>,
}

#[derive(Debug)]
struct StopAfter {
    count: usize,
    min: Duration,
    flag: Arc<AtomicBool>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `flag` once `count` sleeps of at least `min` have been recorded.
    pub fn stop_after(count: usize, min: Duration, flag: Arc<AtomicBool>) -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            stop_after: Some(StopAfter { count, min, flag }),
        }
    }

    /// All recorded delays in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Recorded delays that are at least `min` long
    pub fn sleeps_at_least(&self, min: Duration) -> Vec<Duration> {
        self.sleeps().into_iter().filter(|d| *d >= min).collect()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        let Ok(mut sleeps) = self.sleeps.lock() else {
            return;
        };
        sleeps.push(duration);

        if let Some(stop) = &self.stop_after {
            let counted = sleeps.iter().filter(|d| **d >= stop.min).count();
            if counted >= stop.count {
                stop.flag.store(true, Ordering::SeqCst);
            }
        }
    }
}
