//! Reconnect policy for lost devices
//!
//! Pure backoff bookkeeping; the device adapter decides when a device
//! is actually lost and when to retry.

use std::time::Duration;

use contracts::ReconnectConfig;

/// Exponential backoff schedule for one device
#[derive(Debug, Clone)]
pub struct ReconnectSchedule {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectSchedule {
    /// Create a fresh schedule
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next reconnect attempt
    ///
    /// Returns `None` once the configured attempt budget is exhausted.
    /// A `max_attempts` of 0 means retry forever.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.config.max_attempts != 0 && self.attempts >= self.config.max_attempts {
            return None;
        }

        let factor = self.config.multiplier.max(1.0).powi(self.attempts as i32);
        let delay_s = (self.config.initial_delay_s * factor).min(self.config.max_delay_s);
        self.attempts += 1;
        Some(Duration::from_secs_f64(delay_s))
    }

    /// Reset after a successful reconnect
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts made since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay_s: 0.5,
            max_delay_s: 4.0,
            multiplier: 2.0,
            max_attempts,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let mut schedule = ReconnectSchedule::new(config(0));

        assert_eq!(schedule.next_delay(), Some(Duration::from_secs_f64(0.5)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs_f64(1.0)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs_f64(2.0)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs_f64(4.0)));
        // capped at max_delay_s
        assert_eq!(schedule.next_delay(), Some(Duration::from_secs_f64(4.0)));
    }

    #[test]
    fn test_attempt_budget() {
        let mut schedule = ReconnectSchedule::new(config(2));

        assert!(schedule.next_delay().is_some());
        assert!(schedule.next_delay().is_some());
        assert!(schedule.next_delay().is_none());
        assert_eq!(schedule.attempts(), 2);
    }

    #[test]
    fn test_reset_restarts_backoff() {
        let mut schedule = ReconnectSchedule::new(config(0));

        schedule.next_delay();
        schedule.next_delay();
        schedule.reset();

        assert_eq!(schedule.next_delay(), Some(Duration::from_secs_f64(0.5)));
    }
}
