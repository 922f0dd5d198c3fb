//! Per-sensor baseline calibration.
//!
//! Each sensor calibrates once at session start: the first
//! `sample_target` samples are assumed to be resting noise and produce a
//! per-axis baseline (mean) and noise floor (population standard
//! deviation). A sensor that never delivers enough samples falls back to
//! the configured system-wide baseline after the timeout; the session
//! continues degraded rather than failing.

use std::collections::HashSet;

use contracts::{CalibrationConfig, CalibrationProfile, DeviceId, RawSample};
use tracing::{debug, info, warn};

/// Calibration progress for one sensor.
pub struct Calibrator {
    sensor: DeviceId,
    config: CalibrationConfig,
    samples: Vec<[i16; 3]>,
    started_at: Option<f64>,
    profile: Option<CalibrationProfile>,
}

impl Calibrator {
    /// Create a calibrator for one sensor.
    pub fn new(sensor: DeviceId, config: CalibrationConfig) -> Self {
        let capacity = config_target(&config);
        Self {
            sensor,
            config,
            samples: Vec::with_capacity(capacity),
            started_at: None,
            profile: None,
        }
    }

    /// True once a profile (measured or fallback) exists.
    pub fn is_complete(&self) -> bool {
        self.profile.is_some()
    }

    /// The finished profile, if any.
    pub fn profile(&self) -> Option<&CalibrationProfile> {
        self.profile.as_ref()
    }

    /// Feed one resting sample.
    ///
    /// Returns the profile exactly once, on the sample that completes
    /// collection. Samples after completion are ignored.
    pub fn feed(&mut self, timestamp: f64, sample: &RawSample) -> Option<CalibrationProfile> {
        if self.profile.is_some() {
            return None;
        }

        self.started_at.get_or_insert(timestamp);
        self.samples.push(sample.velocity);

        if self.samples.len() < config_target(&self.config) {
            return None;
        }

        let profile = self.compute_profile();
        info!(
            sensor = %self.sensor,
            samples = profile.sample_count,
            baseline = ?profile.baseline,
            noise = ?profile.noise,
            "calibration complete"
        );
        self.profile = Some(profile.clone());
        Some(profile)
    }

    /// Check the calibration deadline.
    ///
    /// Once `timeout_s` has passed since the first sample (or since the
    /// given `now` if nothing arrived at all is handled by the caller),
    /// produces the fallback profile exactly once.
    pub fn poll_timeout(&mut self, now: f64) -> Option<CalibrationProfile> {
        if self.profile.is_some() {
            return None;
        }

        let started = self.started_at.unwrap_or(now - self.config.timeout_s);
        if now - started < self.config.timeout_s {
            return None;
        }

        warn!(
            sensor = %self.sensor,
            collected = self.samples.len(),
            target = self.config.sample_target,
            "calibration timed out, using fallback baseline"
        );
        let profile =
            CalibrationProfile::fallback(self.sensor.clone(), self.config.fallback_baseline);
        self.profile = Some(profile.clone());
        Some(profile)
    }

    fn compute_profile(&self) -> CalibrationProfile {
        let count = self.samples.len() as f64;

        let mut baseline = [0.0f64; 3];
        for sample in &self.samples {
            for axis in 0..3 {
                baseline[axis] += sample[axis] as f64;
            }
        }
        for axis_mean in baseline.iter_mut() {
            *axis_mean /= count;
        }

        let mut noise = [0.0f64; 3];
        for sample in &self.samples {
            for axis in 0..3 {
                let delta = sample[axis] as f64 - baseline[axis];
                noise[axis] += delta * delta;
            }
        }
        // Population variance: the window is the whole population, not a
        // sample of one.
        for axis_var in noise.iter_mut() {
            *axis_var = (*axis_var / count).sqrt();
        }

        let distinct: HashSet<[i16; 3]> = self.samples.iter().copied().collect();
        if (distinct.len() as u32) < self.config.min_distinct {
            debug!(
                sensor = %self.sensor,
                distinct = distinct.len(),
                "degenerate calibration window, zeroing noise floor"
            );
            noise = [0.0; 3];
        }

        CalibrationProfile {
            sensor: self.sensor.clone(),
            baseline,
            noise,
            sample_count: self.samples.len() as u32,
            fallback: false,
        }
    }
}

fn config_target(config: &CalibrationConfig) -> usize {
    config.sample_target.max(1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(vx: i16, vy: i16, vz: i16) -> RawSample {
        RawSample {
            velocity: [vx, vy, vz],
            displacement: None,
            frequency: None,
            temperature_c: 20.0,
        }
    }

    fn config(target: u32) -> CalibrationConfig {
        CalibrationConfig {
            sample_target: target,
            timeout_s: 10.0,
            min_distinct: 3,
            fallback_baseline: [1.0, 2.0, 3.0],
        }
    }

    #[test]
    fn completes_after_target_samples() {
        let mut cal = Calibrator::new("plate_a".into(), config(100));

        for i in 0..99 {
            assert!(cal.feed(i as f64 * 0.02, &sample(10, -5, i % 7)).is_none());
        }
        let profile = cal.feed(1.98, &sample(10, -5, 99 % 7)).unwrap();

        assert_eq!(profile.sample_count, 100);
        assert!(!profile.fallback);
        assert!((profile.baseline[0] - 10.0).abs() < 1e-9);
        assert!((profile.baseline[1] + 5.0).abs() < 1e-9);
        // Constant axes have zero noise
        assert_eq!(profile.noise[0], 0.0);
        assert!(profile.noise[2] > 0.0);
    }

    #[test]
    fn identical_samples_zero_noise() {
        let mut cal = Calibrator::new("plate_a".into(), config(100));

        let mut profile = None;
        for i in 0..100 {
            profile = cal.feed(i as f64 * 0.02, &sample(42, 42, 42));
        }
        let profile = profile.unwrap();

        assert_eq!(profile.baseline, [42.0, 42.0, 42.0]);
        assert_eq!(profile.noise, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn near_degenerate_window_zeroes_noise() {
        let mut cal = Calibrator::new("plate_a".into(), config(100));

        // Only two distinct triples, below min_distinct = 3
        let mut profile = None;
        for i in 0..100 {
            let s = if i % 2 == 0 {
                sample(10, 10, 10)
            } else {
                sample(11, 10, 10)
            };
            profile = cal.feed(i as f64 * 0.02, &s);
        }

        assert_eq!(profile.unwrap().noise, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn feeds_after_completion_are_ignored() {
        let mut cal = Calibrator::new("plate_a".into(), config(2));
        assert!(cal.feed(0.0, &sample(1, 1, 1)).is_none());
        assert!(cal.feed(0.02, &sample(1, 1, 1)).is_some());
        assert!(cal.feed(0.04, &sample(500, 500, 500)).is_none());
        assert!(cal.is_complete());
    }

    #[test]
    fn timeout_produces_fallback_profile() {
        let mut cal = Calibrator::new("plate_a".into(), config(100));
        cal.feed(0.0, &sample(10, 10, 10));

        assert!(cal.poll_timeout(5.0).is_none());

        let profile = cal.poll_timeout(10.5).unwrap();
        assert!(profile.fallback);
        assert_eq!(profile.baseline, [1.0, 2.0, 3.0]);
        assert_eq!(profile.sample_count, 0);

        // Fires exactly once
        assert!(cal.poll_timeout(20.0).is_none());
    }

    #[test]
    fn timeout_without_any_samples() {
        let mut cal = Calibrator::new("silent".into(), config(100));
        let profile = cal.poll_timeout(30.0).unwrap();
        assert!(profile.fallback);
    }
}
