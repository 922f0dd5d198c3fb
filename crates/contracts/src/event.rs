//! Range events and correlated records - pipeline outputs.

use serde::{Deserialize, Serialize};

use crate::{DeviceId, DeviceRole, TimerEventKind};

/// Confirmed impact on a target sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactEvent {
    /// Sensor that observed the impact
    pub sensor: DeviceId,

    /// Target label the sensor is mounted on
    pub target: String,

    /// Timestamp of the onset sample (seconds)
    pub onset_ts: f64,

    /// Timestamp of the peak sample (seconds)
    pub peak_ts: f64,

    /// Peak magnitude (baseline-corrected Euclidean norm)
    pub peak_magnitude: f64,

    /// Event duration from onset to confirmation (seconds)
    pub duration_s: f64,

    /// Detection confidence in [0, 1]
    pub confidence: f64,
}

/// Timer event emitted by the timer protocol tracker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimerEvent {
    /// Event kind
    pub kind: TimerEventKind,

    /// Receive timestamp (session clock, seconds)
    pub timestamp: f64,

    /// Shot sequence within the string, 1-based; 0 for START/STOP
    pub sequence: u32,

    /// Split time since previous shot (seconds)
    pub split_s: f64,

    /// Cumulative time since string start (seconds)
    pub cumulative_s: f64,

    /// String number
    pub string_number: u32,
}

/// Device lifecycle status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatusKind {
    /// Device connected and streaming
    Connected,
    /// Calibration completed with a measured baseline
    Calibrated,
    /// Running on a fallback baseline or after repeated reconnects
    Degraded,
    /// Device lost and not (yet) recovered
    Lost,
}

/// Device status event.
///
/// Status changes are observability signals, not errors; they are logged
/// and counted, never escalated into pipeline failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// Affected device
    pub device: DeviceId,

    /// Role of the affected device
    pub role: DeviceRole,

    /// New status
    pub kind: DeviceStatusKind,

    /// Timestamp of the change (seconds)
    pub timestamp: f64,
}

/// Unified event stream unit.
///
/// All per-device pipelines feed one merged channel of these; the
/// correlation engine is the single consumer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RangeEvent {
    /// Timer protocol event
    Timer(TimerEvent),
    /// Confirmed impact
    Impact(ImpactEvent),
    /// Device lifecycle change
    Status(DeviceStatus),
}

impl RangeEvent {
    /// Event timestamp on the shared session clock.
    pub fn timestamp(&self) -> f64 {
        match self {
            RangeEvent::Timer(e) => e.timestamp,
            RangeEvent::Impact(e) => e.peak_ts,
            RangeEvent::Status(e) => e.timestamp,
        }
    }

    /// Event kind label for log context.
    pub fn kind_str(&self) -> &'static str {
        match self {
            RangeEvent::Timer(e) => e.kind.as_str(),
            RangeEvent::Impact(_) => "impact",
            RangeEvent::Status(_) => "status",
        }
    }
}

/// Correlation quality tier, by absolute timer-to-impact offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationQuality {
    /// |offset| within the excellent cutoff
    Excellent,
    /// |offset| within the good cutoff
    Good,
    /// |offset| within the correlation window
    Fair,
    /// No impact candidate found inside the window
    NoImpact,
}

impl CorrelationQuality {
    /// Stable lowercase label for records and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            CorrelationQuality::Excellent => "excellent",
            CorrelationQuality::Good => "good",
            CorrelationQuality::Fair => "fair",
            CorrelationQuality::NoImpact => "no_impact",
        }
    }
}

/// Correlation diagnostics attached to each record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMeta {
    /// Window half-width used for pairing (seconds)
    pub window_s: f64,

    /// Impact candidates considered for this record
    pub candidates_considered: u32,

    /// Pending SHOTs held open when this record finalized
    pub pending_depth: u32,

    /// Impacts dropped from the candidate buffer so far (expired/overflow)
    pub dropped_count: u32,

    /// Out-of-order impacts observed so far
    pub out_of_order_count: u32,
}

/// Correlated output record - the pipeline's unit of truth.
///
/// Every timer event produces exactly one record. START/STOP records carry
/// no pairing (`impact`, `offset_s` and `quality` all `None`); SHOT
/// records always carry a quality, `NoImpact` when the window closed
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedRecord {
    /// Monotonically increasing record sequence number
    pub record_id: u64,

    /// The timer event this record is anchored on
    pub timer: TimerEvent,

    /// Best-matching impact, if any
    pub impact: Option<ImpactEvent>,

    /// Signed offset impact.peak_ts - timer.timestamp (seconds)
    pub offset_s: Option<f64>,

    /// Quality tier; `None` for START/STOP records
    pub quality: Option<CorrelationQuality>,

    /// Diagnostics snapshot at finalization time
    pub meta: CorrelationMeta,
}
