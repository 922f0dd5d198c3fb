//! Simulated vibration sensor
//!
//! Implements `DeviceSource`, generates encoded vibration frames in a
//! background thread. Emits quiet baseline samples plus scripted impact
//! transients, which is enough to drive calibration and detection without
//! hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use contracts::{DeviceId, DeviceRole, DeviceSource, Notification, NotificationCallback};
use tracing::{debug, trace};

use crate::clock::SessionClock;
use crate::wire::{encode_compact_frame, encode_extended_frame};

// Rise and decay shape applied to scripted impacts, one entry per sample.
const IMPACT_SHAPE: [f64; 12] = [
    0.4, 0.8, 1.0, 0.85, 0.7, 0.55, 0.42, 0.3, 0.2, 0.12, 0.06, 0.02,
];

// Cyclic jitter added to the baseline so calibration sees distinct values.
const NOISE_CYCLE: [i16; 5] = [-2, -1, 0, 1, 2];

/// Simulated sensor configuration
#[derive(Debug, Clone)]
pub struct SimSensorConfig {
    /// Send frequency (Hz)
    pub sample_rate_hz: f64,
    /// Quiet-state velocity baseline
    pub baseline: [i16; 3],
    /// Peak velocity added on the dominant axis during an impact
    pub impact_peak: i16,
    /// Session times (seconds) at which impacts occur
    pub impact_times: Vec<f64>,
    /// Emit extended frames instead of compact ones
    pub extended: bool,
}

impl Default for SimSensorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50.0,
            baseline: [10, -5, 20],
            impact_peak: 400,
            impact_times: Vec::new(),
            extended: false,
        }
    }
}

/// Simulated vibration sensor
pub struct SimSensor {
    device_id: DeviceId,
    config: SimSensorConfig,
    clock: SessionClock,
    listening: Arc<AtomicBool>,
}

impl SimSensor {
    /// Create a new simulated sensor
    pub fn new(device_id: impl Into<DeviceId>, config: SimSensorConfig, clock: SessionClock) -> Self {
        Self {
            device_id: device_id.into(),
            config,
            clock,
            listening: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Impact contribution on the dominant axis at session time `t`
    fn impact_component(config: &SimSensorConfig, t: f64) -> i16 {
        let sample_interval = 1.0 / config.sample_rate_hz;
        for &impact_at in &config.impact_times {
            let dt = t - impact_at;
            if dt < 0.0 {
                continue;
            }
            let index = (dt / sample_interval) as usize;
            if index < IMPACT_SHAPE.len() {
                return (config.impact_peak as f64 * IMPACT_SHAPE[index]).round() as i16;
            }
        }
        0
    }

    fn build_payload(config: &SimSensorConfig, t: f64, sample_index: u64) -> Bytes {
        let jitter = NOISE_CYCLE[(sample_index as usize) % NOISE_CYCLE.len()];
        let spike = Self::impact_component(config, t);

        let velocity = [
            config.baseline[0].saturating_add(jitter).saturating_add(spike),
            config.baseline[1].saturating_add(jitter),
            config.baseline[2].saturating_add(jitter),
        ];

        let frame: Vec<u8> = if config.extended {
            encode_extended_frame(velocity, [0; 3], [500, 500, 500], 2200).to_vec()
        } else {
            encode_compact_frame(velocity, 2200).to_vec()
        };
        Bytes::from(frame)
    }
}

impl DeviceSource for SimSensor {
    fn device_id(&self) -> &str {
        self.device_id.as_str()
    }

    fn role(&self) -> DeviceRole {
        DeviceRole::Sensor
    }

    fn listen(&self, callback: NotificationCallback) {
        // Idempotent: if already listening, don't start again
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let device_id = self.device_id.clone();
        let config = self.config.clone();
        let clock = self.clock;
        let listening = self.listening.clone();

        let interval = Duration::from_secs_f64(1.0 / config.sample_rate_hz);

        thread::spawn(move || {
            let mut sample_index: u64 = 0;

            debug!(
                device = %device_id,
                sample_rate_hz = config.sample_rate_hz,
                impacts = config.impact_times.len(),
                "sim sensor started"
            );

            while listening.load(Ordering::Relaxed) {
                let timestamp = clock.now();
                let payload = Self::build_payload(&config, timestamp, sample_index);
                sample_index += 1;

                callback(Notification {
                    device: device_id.clone(),
                    role: DeviceRole::Sensor,
                    timestamp,
                    payload,
                });

                trace!(device = %device_id, sample_index, timestamp, "sim frame sent");
                thread::sleep(interval);
            }

            debug!(device = %device_id, "sim sensor stopped");
        });
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_sim_sensor_emits_frames() {
        let sensor = SimSensor::new(
            "plate_a",
            SimSensorConfig {
                sample_rate_hz: 200.0,
                ..Default::default()
            },
            SessionClock::start(),
        );

        let count = Arc::new(AtomicU64::new(0));
        let count_clone = count.clone();

        sensor.listen(Arc::new(move |notification| {
            assert_eq!(notification.device.as_str(), "plate_a");
            assert_eq!(notification.role, DeviceRole::Sensor);
            assert_eq!(notification.payload.len(), 20);
            assert_eq!(notification.payload[0], 0x55);
            count_clone.fetch_add(1, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(50));
        sensor.stop();

        assert!(count.load(Ordering::Relaxed) > 0);
        assert!(!sensor.is_listening());
    }

    #[test]
    fn test_sim_sensor_idempotent_listen() {
        let sensor = SimSensor::new(
            "plate_a",
            SimSensorConfig {
                sample_rate_hz: 100.0,
                ..Default::default()
            },
            SessionClock::start(),
        );

        let count = Arc::new(AtomicU64::new(0));
        let count1 = count.clone();
        let count2 = count.clone();

        sensor.listen(Arc::new(move |_| {
            count1.fetch_add(1, Ordering::Relaxed);
        }));

        // Second call should be ignored
        sensor.listen(Arc::new(move |_| {
            count2.fetch_add(100, Ordering::Relaxed);
        }));

        thread::sleep(Duration::from_millis(60));
        sensor.stop();

        let final_count = count.load(Ordering::Relaxed);
        assert!(final_count > 0);
        assert!(final_count < 50);
    }

    #[test]
    fn test_impact_component_shape() {
        let config = SimSensorConfig {
            sample_rate_hz: 50.0,
            impact_peak: 400,
            impact_times: vec![1.0],
            ..Default::default()
        };

        // quiet before the impact
        assert_eq!(SimSensor::impact_component(&config, 0.5), 0);
        // peak a couple of samples in
        assert_eq!(SimSensor::impact_component(&config, 1.0 + 2.0 / 50.0), 400);
        // decayed back to quiet afterwards
        assert_eq!(SimSensor::impact_component(&config, 1.0 + 1.0), 0);
    }

    #[test]
    fn test_extended_frame_length() {
        let config = SimSensorConfig {
            extended: true,
            ..Default::default()
        };
        let payload = SimSensor::build_payload(&config, 0.0, 0);
        assert_eq!(payload.len(), 28);
    }
}
