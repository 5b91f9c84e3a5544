//! Time management utilities

use std::time::{Duration, Instant};

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::start_new()
    }
}

impl Stopwatch {
    /// Create a new stopwatch and start it immediately
    #[must_use]
    pub fn start_new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Restart the stopwatch from zero
    pub fn restart(&mut self) {
        self.start_time = Instant::now();
    }

    /// Get the elapsed time since the stopwatch was started
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Get the elapsed time in seconds
    #[must_use]
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }
}
