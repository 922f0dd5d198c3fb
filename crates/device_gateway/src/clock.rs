//! Shared session clock
//!
//! Every device source in a session stamps notifications against the same
//! zero point, so timer and sensor timestamps are directly comparable.

use std::time::Instant;

/// Monotonic clock shared by all devices in a session
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    /// Start a new session clock at the current instant
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds elapsed since session start
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
