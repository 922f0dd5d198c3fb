//! CalibrationProfile - Calibration output.

use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Per-sensor resting baseline and noise floor.
///
/// Produced once per sensor at session start and then read-only for the
/// rest of the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Calibrated sensor
    pub sensor: DeviceId,

    /// Mean resting velocity per axis (raw counts)
    pub baseline: [f64; 3],

    /// Population standard deviation per axis (raw counts)
    pub noise: [f64; 3],

    /// Samples that contributed to the profile
    pub sample_count: u32,

    /// True when the profile is a fallback (timeout), not measured
    pub fallback: bool,
}

impl CalibrationProfile {
    /// Fallback profile used when a sensor fails to calibrate in time.
    pub fn fallback(sensor: DeviceId, baseline: [f64; 3]) -> Self {
        Self {
            sensor,
            baseline,
            noise: [0.0; 3],
            sample_count: 0,
            fallback: true,
        }
    }
}
