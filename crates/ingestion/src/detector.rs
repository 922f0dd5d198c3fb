//! Impact detection state machine.
//!
//! Runs per sensor, after calibration. Sample magnitude is the Euclidean
//! norm of the baseline-corrected velocity axes. The machine is:
//!
//! - `Idle` -> `OnsetWatch` when magnitude exceeds the onset threshold
//! - `OnsetWatch` -> `TrackingPeak` when it exceeds the peak threshold
//!   within the lookback window, else back to `Idle` (abort)
//! - `TrackingPeak` -> confirmed event once magnitude falls back to the
//!   onset threshold, or the event length cap is hit
//!
//! All threshold comparisons are strict greater-than.

use contracts::{CalibrationProfile, DetectionConfig, DeviceId, ImpactEvent};
use tracing::{debug, trace};

/// Per-sensor impact detector.
pub struct ImpactDetector {
    sensor: DeviceId,
    target: String,
    config: DetectionConfig,
    profile: CalibrationProfile,
    state: DetectorState,
    confirmed: u64,
    aborted: u64,
}

#[derive(Debug)]
enum DetectorState {
    Idle,
    OnsetWatch(EventWindow),
    TrackingPeak(EventWindow),
}

/// Samples collected since onset, with the running peak index.
#[derive(Debug)]
struct EventWindow {
    onset_ts: f64,
    samples: Vec<(f64, f64)>,
    peak_idx: usize,
}

impl EventWindow {
    fn open(timestamp: f64, magnitude: f64) -> Self {
        Self {
            onset_ts: timestamp,
            samples: vec![(timestamp, magnitude)],
            peak_idx: 0,
        }
    }

    fn push(&mut self, timestamp: f64, magnitude: f64) {
        self.samples.push((timestamp, magnitude));
        if magnitude > self.samples[self.peak_idx].1 {
            self.peak_idx = self.samples.len() - 1;
        }
    }

    fn peak(&self) -> (f64, f64) {
        self.samples[self.peak_idx]
    }
}

impl ImpactDetector {
    /// Create a detector for a calibrated sensor.
    pub fn new(
        sensor: DeviceId,
        target: String,
        config: DetectionConfig,
        profile: CalibrationProfile,
    ) -> Self {
        Self {
            sensor,
            target,
            config,
            profile,
            state: DetectorState::Idle,
            confirmed: 0,
            aborted: 0,
        }
    }

    /// Baseline-corrected magnitude of one sample.
    pub fn magnitude(&self, velocity: [i16; 3]) -> f64 {
        let mut sum = 0.0;
        for axis in 0..3 {
            let corrected = velocity[axis] as f64 - self.profile.baseline[axis];
            sum += corrected * corrected;
        }
        sum.sqrt()
    }

    /// Push one sample; returns a confirmed impact when one closes.
    pub fn push(&mut self, timestamp: f64, velocity: [i16; 3]) -> Option<ImpactEvent> {
        let magnitude = self.magnitude(velocity);
        trace!(sensor = %self.sensor, magnitude, "detector sample");

        let state = std::mem::replace(&mut self.state, DetectorState::Idle);
        let (next, event) = self.step(state, timestamp, magnitude);
        self.state = next;
        event
    }

    /// Confirmed event count.
    pub fn confirmed_count(&self) -> u64 {
        self.confirmed
    }

    /// Aborted onset count.
    pub fn aborted_count(&self) -> u64 {
        self.aborted
    }

    fn step(
        &mut self,
        state: DetectorState,
        timestamp: f64,
        magnitude: f64,
    ) -> (DetectorState, Option<ImpactEvent>) {
        match state {
            DetectorState::Idle => {
                if magnitude > self.config.onset_threshold {
                    trace!(sensor = %self.sensor, magnitude, "onset watch opened");
                    (
                        DetectorState::OnsetWatch(EventWindow::open(timestamp, magnitude)),
                        None,
                    )
                } else {
                    (DetectorState::Idle, None)
                }
            }

            DetectorState::OnsetWatch(mut window) => {
                window.push(timestamp, magnitude);

                if magnitude > self.config.peak_threshold {
                    return (DetectorState::TrackingPeak(window), None);
                }

                if window.samples.len() > self.config.lookback_samples {
                    self.aborted += 1;
                    metrics::counter!("detector_onsets_aborted_total").increment(1);
                    debug!(
                        sensor = %self.sensor,
                        onset_ts = window.onset_ts,
                        "onset aborted, no peak within lookback"
                    );
                    return (DetectorState::Idle, None);
                }

                (DetectorState::OnsetWatch(window), None)
            }

            DetectorState::TrackingPeak(mut window) => {
                window.push(timestamp, magnitude);

                let closed = magnitude <= self.config.onset_threshold
                    || window.samples.len() >= self.config.max_event_samples;
                if !closed {
                    return (DetectorState::TrackingPeak(window), None);
                }

                let event = self.confirm(&window, timestamp);
                (DetectorState::Idle, Some(event))
            }
        }
    }

    fn confirm(&mut self, window: &EventWindow, end_ts: f64) -> ImpactEvent {
        let (peak_ts, peak_magnitude) = window.peak();
        let confidence = shape_confidence(&window.samples, window.peak_idx);

        self.confirmed += 1;
        metrics::counter!("detector_impacts_confirmed_total").increment(1);
        debug!(
            sensor = %self.sensor,
            peak_magnitude,
            confidence,
            duration_s = end_ts - window.onset_ts,
            "impact confirmed"
        );

        ImpactEvent {
            sensor: self.sensor.clone(),
            target: self.target.clone(),
            onset_ts: window.onset_ts,
            peak_ts,
            peak_magnitude,
            duration_s: end_ts - window.onset_ts,
            confidence,
        }
    }
}

/// Confidence from pulse shape: the fraction of strictly rising steps
/// before the peak averaged with the fraction of strictly falling steps
/// after it. A clean single-pulse impact scores 1.0; a ragged resonance
/// tail pulls the score down.
fn shape_confidence(samples: &[(f64, f64)], peak_idx: usize) -> f64 {
    let rise = clean_fraction(&samples[..=peak_idx], |prev, next| next > prev);
    let decay = clean_fraction(&samples[peak_idx..], |prev, next| next < prev);
    ((rise + decay) / 2.0).clamp(0.0, 1.0)
}

fn clean_fraction(samples: &[(f64, f64)], clean: impl Fn(f64, f64) -> bool) -> f64 {
    if samples.len() < 2 {
        return 1.0;
    }
    let steps = samples.len() - 1;
    let clean_steps = samples
        .windows(2)
        .filter(|pair| clean(pair[0].1, pair[1].1))
        .count();
    clean_steps as f64 / steps as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> ImpactDetector {
        let profile = CalibrationProfile {
            sensor: "plate_a".into(),
            baseline: [0.0, 0.0, 0.0],
            noise: [1.0, 1.0, 1.0],
            sample_count: 100,
            fallback: false,
        };
        ImpactDetector::new(
            "plate_a".into(),
            "A".into(),
            DetectionConfig::default(),
            profile,
        )
    }

    fn run(detector: &mut ImpactDetector, series: &[i16]) -> Vec<ImpactEvent> {
        series
            .iter()
            .enumerate()
            .filter_map(|(i, &vx)| detector.push(i as f64 * 0.02, [vx, 0, 0]))
            .collect()
    }

    #[test]
    fn clean_impact_confirms_once() {
        let mut det = detector();
        // quiet, rise through onset and peak, decay back to quiet
        let series = [5, 8, 40, 120, 200, 400, 250, 90, 40, 20, 5, 5];
        let events = run(&mut det, &series);

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.sensor, "plate_a");
        assert_eq!(event.target, "A");
        assert!((event.peak_magnitude - 400.0).abs() < 1e-9);
        // onset at index 2 (first magnitude > 30), peak at index 5
        assert!((event.onset_ts - 0.04).abs() < 1e-9);
        assert!((event.peak_ts - 0.10).abs() < 1e-9);
        assert!(event.duration_s > 0.0);
        assert!(event.confidence > 0.9);
        assert_eq!(det.confirmed_count(), 1);
    }

    #[test]
    fn sub_peak_rattle_never_fires() {
        let mut det = detector();
        // crosses onset repeatedly but never exceeds the peak threshold
        let series = [5, 40, 80, 120, 100, 60, 35, 90, 140, 110, 50, 10, 5];
        let events = run(&mut det, &series);

        assert!(events.is_empty());
        assert_eq!(det.confirmed_count(), 0);
    }

    #[test]
    fn onset_aborts_after_lookback_window() {
        let mut det = detector();
        // 40 opens the watch, then 11 more samples below peak
        let series = [40, 50, 50, 50, 50, 50, 50, 50, 50, 50, 50, 50];
        let events = run(&mut det, &series);

        assert!(events.is_empty());
        assert_eq!(det.aborted_count(), 1);
    }

    #[test]
    fn quiet_series_stays_idle() {
        let mut det = detector();
        let events = run(&mut det, &[1, 2, 3, 2, 1, 0, 2, 3]);
        assert!(events.is_empty());
    }

    #[test]
    fn thresholds_are_strict() {
        let mut det = detector();
        // exactly at the onset threshold: not an onset
        assert!(det.push(0.0, [30, 0, 0]).is_none());
        assert!(matches!(det.state, DetectorState::Idle));

        // one above: onset
        assert!(det.push(0.02, [31, 0, 0]).is_none());
        assert!(matches!(det.state, DetectorState::OnsetWatch(_)));

        // exactly at the peak threshold: still watching
        assert!(det.push(0.04, [150, 0, 0]).is_none());
        assert!(matches!(det.state, DetectorState::OnsetWatch(_)));

        // one above: tracking
        assert!(det.push(0.06, [151, 0, 0]).is_none());
        assert!(matches!(det.state, DetectorState::TrackingPeak(_)));
    }

    #[test]
    fn baseline_correction_applies() {
        let profile = CalibrationProfile {
            sensor: "plate_a".into(),
            baseline: [100.0, 0.0, 0.0],
            noise: [1.0, 1.0, 1.0],
            sample_count: 100,
            fallback: false,
        };
        let det = ImpactDetector::new(
            "plate_a".into(),
            "A".into(),
            DetectionConfig::default(),
            profile,
        );

        // raw 100 on x is exactly the baseline: zero magnitude
        assert_eq!(det.magnitude([100, 0, 0]), 0.0);
        assert!((det.magnitude([103, 4, 0]) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn two_separated_impacts_confirm_separately() {
        let mut det = detector();
        let pulse = [5, 40, 200, 300, 120, 50, 20, 5];
        let mut series = pulse.to_vec();
        series.extend_from_slice(&[5, 5, 5]);
        series.extend_from_slice(&pulse);

        let events = run(&mut det, &series);
        assert_eq!(events.len(), 2);
        assert!(events[0].peak_ts < events[1].peak_ts);
    }

    #[test]
    fn runaway_event_force_closes() {
        let profile = CalibrationProfile {
            sensor: "plate_a".into(),
            baseline: [0.0; 3],
            noise: [1.0; 3],
            sample_count: 100,
            fallback: false,
        };
        let config = DetectionConfig {
            max_event_samples: 20,
            ..Default::default()
        };
        let mut det = ImpactDetector::new("plate_a".into(), "A".into(), config, profile);

        det.push(0.0, [40, 0, 0]);
        det.push(0.02, [200, 0, 0]);
        // magnitude never falls back below onset
        let mut events = Vec::new();
        for i in 2..40 {
            if let Some(event) = det.push(i as f64 * 0.02, [180, 0, 0]) {
                events.push(event);
            }
        }
        assert_eq!(events.len(), 1);
    }
}
