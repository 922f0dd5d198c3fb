//! RangeBlueprint - Config Loader output
//!
//! Describes a complete session configuration: devices, calibration,
//! impact detection, correlation policy and output routing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::DeviceRole;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Session settings
    pub session: SessionConfig,

    /// Device definitions
    pub devices: Vec<DeviceConfig>,

    /// Calibration policy
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Impact detection thresholds
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Correlation policy
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Reconnect policy for lost devices
    #[serde(default)]
    pub reconnect: ReconnectConfig,

    /// Event channel settings
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Output routing configuration
    pub sinks: Vec<SinkConfig>,
}

/// Session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session name (used for output directories and log context)
    pub name: String,

    /// Optional free-form description
    #[serde(default)]
    pub description: Option<String>,
}

/// Device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Logical identifier (unique within the blueprint)
    pub id: String,

    /// Hardware address the transport pairs on
    pub addr: String,

    /// Device role
    pub role: DeviceRole,

    /// Target label the device is mounted on (sensors only)
    #[serde(default)]
    pub target: Option<String>,

    /// Expected sample rate (Hz)
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,
}

fn default_sample_rate() -> f64 {
    50.0
}

/// Calibration policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Samples collected before computing the profile
    #[serde(default = "default_sample_target")]
    pub sample_target: u32,

    /// Seconds to wait before falling back to the default baseline
    #[serde(default = "default_calibration_timeout")]
    pub timeout_s: f64,

    /// Minimum distinct magnitudes for a usable noise estimate
    #[serde(default = "default_min_distinct")]
    pub min_distinct: u32,

    /// Baseline used when a sensor fails to calibrate in time
    #[serde(default)]
    pub fallback_baseline: [f64; 3],
}

fn default_sample_target() -> u32 {
    100
}

fn default_calibration_timeout() -> f64 {
    10.0
}

fn default_min_distinct() -> u32 {
    3
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sample_target: default_sample_target(),
            timeout_s: default_calibration_timeout(),
            min_distinct: default_min_distinct(),
            fallback_baseline: [0.0; 3],
        }
    }
}

/// Impact detection thresholds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Magnitude that opens an onset watch (strictly greater-than)
    #[serde(default = "default_onset_threshold")]
    pub onset_threshold: f64,

    /// Magnitude that confirms peak tracking (strictly greater-than)
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f64,

    /// Samples after onset within which the peak must appear
    #[serde(default = "default_lookback_samples")]
    pub lookback_samples: usize,

    /// Hard cap on event length before force-closing (samples)
    #[serde(default = "default_max_event_samples")]
    pub max_event_samples: usize,
}

fn default_onset_threshold() -> f64 {
    30.0
}

fn default_peak_threshold() -> f64 {
    150.0
}

fn default_lookback_samples() -> usize {
    10
}

fn default_max_event_samples() -> usize {
    500
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            onset_threshold: default_onset_threshold(),
            peak_threshold: default_peak_threshold(),
            lookback_samples: default_lookback_samples(),
            max_event_samples: default_max_event_samples(),
        }
    }
}

/// Correlation policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Window half-width around each SHOT (seconds)
    #[serde(default = "default_window")]
    pub window_s: f64,

    /// |offset| cutoff for the excellent tier (seconds)
    #[serde(default = "default_excellent")]
    pub excellent_s: f64,

    /// |offset| cutoff for the good tier (seconds)
    #[serde(default = "default_good")]
    pub good_s: f64,

    /// Impact candidate buffer capacity
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_window() -> f64 {
    2.0
}

fn default_excellent() -> f64 {
    0.5
}

fn default_good() -> f64 {
    1.0
}

fn default_buffer_size() -> usize {
    256
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            window_s: default_window(),
            excellent_s: default_excellent(),
            good_s: default_good(),
            buffer_size: default_buffer_size(),
        }
    }
}

/// Reconnect policy (exponential backoff)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// First retry delay (seconds)
    #[serde(default = "default_initial_delay")]
    pub initial_delay_s: f64,

    /// Delay ceiling (seconds)
    #[serde(default = "default_max_delay")]
    pub max_delay_s: f64,

    /// Delay growth factor per attempt
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Give up after this many attempts; 0 means retry forever
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_initial_delay() -> f64 {
    0.5
}

fn default_max_delay() -> f64 {
    10.0
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay_s: default_initial_delay(),
            max_delay_s: default_max_delay(),
            multiplier: default_multiplier(),
            max_attempts: 0,
        }
    }
}

/// Event channel settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Merged event channel capacity
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Drop policy when the channel is full
    #[serde(default)]
    pub drop_policy: DropPolicy,
}

fn default_channel_capacity() -> usize {
    256
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            drop_policy: DropPolicy::default(),
        }
    }
}

/// Drop policy when backpressure is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropPolicy {
    /// Drop the newest event
    #[default]
    DropNewest,
    /// Drop the oldest event
    DropOldest,
}

/// Sink output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File output (JSONL)
    File,
    /// Network output (UDP)
    Network,
}

impl RangeBlueprint {
    /// All devices with the timer role.
    pub fn timer_devices(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices_with_role(DeviceRole::Timer)
    }

    /// All devices with the sensor role.
    pub fn sensor_devices(&self) -> impl Iterator<Item = &DeviceConfig> {
        self.devices_with_role(DeviceRole::Sensor)
    }

    /// The timer device driving the session, if configured.
    pub fn primary_timer(&self) -> Option<&DeviceConfig> {
        self.timer_devices().next()
    }

    /// Look up a device by logical id.
    pub fn device(&self, id: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|device| device.id == id)
    }

    fn devices_with_role(&self, role: DeviceRole) -> impl Iterator<Item = &DeviceConfig> {
        self.devices.iter().filter(move |device| device.role == role)
    }
}
