//! Decoded wire frames - ingestion codec output.

use serde::{Deserialize, Serialize};

/// One decoded vibration sample.
///
/// Velocity axes are raw signed counts as sent by the sensor; baseline
/// correction and magnitude computation happen in the detector, not here.
/// Displacement and dominant frequency are only present in the extended
/// frame variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    /// Velocity, raw counts (x, y, z)
    pub velocity: [i16; 3],

    /// Displacement in micrometers (extended frames only)
    pub displacement: Option<[i16; 3]>,

    /// Dominant frequency in 0.1 Hz units (extended frames only)
    pub frequency: Option<[i16; 3]>,

    /// Board temperature in degrees Celsius
    pub temperature_c: f64,
}

/// Timer protocol event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerEventKind {
    /// String start (beep)
    Start,
    /// Shot detected by the timer microphone
    Shot,
    /// String review / stop
    Stop,
}

impl TimerEventKind {
    /// Stable lowercase label for logging and records.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerEventKind::Start => "start",
            TimerEventKind::Shot => "shot",
            TimerEventKind::Stop => "stop",
        }
    }
}

/// One decoded timer frame.
///
/// Times are already scaled from wire centiseconds to seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerFrame {
    /// Event kind carried by the frame discriminator
    pub kind: TimerEventKind,

    /// Shot count within the current string
    pub shot_count: u16,

    /// String number as reported by the timer
    pub string_number: u16,

    /// Cumulative time since string start (seconds)
    pub cumulative_s: f64,

    /// Split time since the previous shot (seconds)
    pub split_s: f64,
}
