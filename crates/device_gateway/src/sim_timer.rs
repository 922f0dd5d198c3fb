//! Simulated shot timer
//!
//! Implements `DeviceSource`, emits an encoded START / SHOT / STOP frame
//! sequence on the shared session clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{DeviceId, DeviceRole, DeviceSource, Notification, NotificationCallback};
use tracing::{debug, trace};

use crate::clock::SessionClock;
use crate::wire::{encode_timer_frame, to_centiseconds, CODE_SHOT, CODE_START, CODE_STOP};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Simulated timer configuration
#[derive(Debug, Clone)]
pub struct SimTimerConfig {
    /// Session time of the START signal
    pub start_at_s: f64,
    /// Session times of each SHOT, must be after `start_at_s`
    pub shot_times: Vec<f64>,
    /// Delay after the last shot before STOP
    pub stop_delay_s: f64,
    /// String number reported in every frame
    pub string_number: u16,
}

impl Default for SimTimerConfig {
    fn default() -> Self {
        Self {
            start_at_s: 1.0,
            shot_times: vec![3.0, 4.2, 5.5],
            stop_delay_s: 2.0,
            string_number: 1,
        }
    }
}

/// Simulated shot timer
pub struct SimTimer {
    device_id: DeviceId,
    config: SimTimerConfig,
    clock: SessionClock,
    listening: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
}

impl SimTimer {
    /// Create a new simulated timer
    pub fn new(device_id: impl Into<DeviceId>, config: SimTimerConfig, clock: SessionClock) -> Self {
        Self {
            device_id: device_id.into(),
            config,
            clock,
            listening: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Build the frame schedule: (due time, encoded frame)
    fn schedule(config: &SimTimerConfig) -> Vec<(f64, [u8; 12])> {
        let mut frames = Vec::with_capacity(config.shot_times.len() + 2);

        frames.push((
            config.start_at_s,
            encode_timer_frame(CODE_START, 0, config.string_number, 0, 0),
        ));

        let mut previous = config.start_at_s;
        let mut cumulative_cs = 0;
        for (index, &shot_at) in config.shot_times.iter().enumerate() {
            cumulative_cs = to_centiseconds(shot_at - config.start_at_s);
            let split_cs = to_centiseconds(shot_at - previous);
            frames.push((
                shot_at,
                encode_timer_frame(
                    CODE_SHOT,
                    (index + 1) as u16,
                    config.string_number,
                    cumulative_cs,
                    split_cs,
                ),
            ));
            previous = shot_at;
        }

        let stop_at = config
            .shot_times
            .last()
            .copied()
            .unwrap_or(config.start_at_s)
            + config.stop_delay_s;
        frames.push((
            stop_at,
            encode_timer_frame(
                CODE_STOP,
                config.shot_times.len() as u16,
                config.string_number,
                cumulative_cs,
                0,
            ),
        ));

        frames
    }
}

impl DeviceSource for SimTimer {
    fn device_id(&self) -> &str {
        self.device_id.as_str()
    }

    fn role(&self) -> DeviceRole {
        DeviceRole::Timer
    }

    fn listen(&self, callback: NotificationCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let device_id = self.device_id.clone();
        let clock = self.clock;
        let listening = self.listening.clone();
        let exhausted = self.exhausted.clone();
        let schedule = Self::schedule(&self.config);

        thread::spawn(move || {
            debug!(
                device = %device_id,
                frames = schedule.len(),
                "sim timer started"
            );

            for (due, frame) in schedule {
                loop {
                    if !listening.load(Ordering::Relaxed) {
                        debug!(device = %device_id, "sim timer stopped");
                        return;
                    }
                    if clock.now() >= due {
                        break;
                    }
                    thread::sleep(POLL_INTERVAL);
                }

                let timestamp = clock.now();
                callback(Notification {
                    device: device_id.clone(),
                    role: DeviceRole::Timer,
                    timestamp,
                    payload: Bytes::copy_from_slice(&frame),
                });
                trace!(device = %device_id, code = frame[1], timestamp, "timer frame sent");
            }

            debug!(device = %device_id, "sim timer sequence complete");
            exhausted.store(true, Ordering::SeqCst);
            listening.store(false, Ordering::SeqCst);
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_schedule_order_and_counts() {
        let config = SimTimerConfig {
            start_at_s: 1.0,
            shot_times: vec![2.0, 3.5],
            stop_delay_s: 1.0,
            string_number: 2,
        };

        let schedule = SimTimer::schedule(&config);
        assert_eq!(schedule.len(), 4);

        assert_eq!(schedule[0].1[1], CODE_START);
        assert_eq!(schedule[1].1[1], CODE_SHOT);
        assert_eq!(schedule[2].1[1], CODE_SHOT);
        assert_eq!(schedule[3].1[1], CODE_STOP);

        // second shot: count 2, cumulative 2.5s, split 1.5s
        let shot = schedule[2].1;
        assert_eq!(u16::from_be_bytes([shot[2], shot[3]]), 2);
        assert_eq!(u16::from_be_bytes([shot[6], shot[7]]), 250);
        assert_eq!(u16::from_be_bytes([shot[8], shot[9]]), 150);

        // stop carries the final shot count and cumulative time
        let stop = schedule[3].1;
        assert_eq!(stop[1], CODE_STOP);
        assert_eq!(u16::from_be_bytes([stop[2], stop[3]]), 2);
        assert_eq!(u16::from_be_bytes([stop[6], stop[7]]), 250);
        assert_eq!(schedule[3].0, 4.5);
    }

    #[test]
    fn test_sim_timer_emits_sequence() {
        let timer = SimTimer::new(
            "timer1",
            SimTimerConfig {
                start_at_s: 0.01,
                shot_times: vec![0.03, 0.05],
                stop_delay_s: 0.01,
                string_number: 1,
            },
            SessionClock::start(),
        );

        let codes = Arc::new(Mutex::new(Vec::new()));
        let codes_clone = codes.clone();

        timer.listen(Arc::new(move |notification| {
            assert_eq!(notification.payload.len(), 12);
            assert_eq!(notification.payload[0], 0x6C);
            codes_clone.lock().unwrap().push(notification.payload[1]);
        }));

        // Wait for the whole sequence to play out
        thread::sleep(Duration::from_millis(200));
        assert!(timer.is_exhausted());
        assert!(!timer.is_listening());
        timer.stop();

        let codes = codes.lock().unwrap();
        assert_eq!(codes.as_slice(), &[CODE_START, CODE_SHOT, CODE_SHOT, CODE_STOP]);
    }
}
