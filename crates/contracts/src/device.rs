//! Device identity and inbound notification unit.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::DeviceId;

/// Role a device plays in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    /// Shot timer (START / SHOT / STOP frames)
    Timer,
    /// Vibration sensor mounted on a target
    Sensor,
}

impl DeviceRole {
    /// Stable lowercase label for logging and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceRole::Timer => "timer",
            DeviceRole::Sensor => "sensor",
        }
    }
}

/// One raw notification received from a device.
///
/// The payload is the unparsed wire bytes of the notification; a single
/// notification may carry zero or more concatenated frames. Decoding
/// happens downstream in ingestion, never at the transport edge.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Originating device
    pub device: DeviceId,

    /// Role of the originating device
    pub role: DeviceRole,

    /// Receive timestamp (session clock, seconds, f64)
    pub timestamp: f64,

    /// Raw notification bytes (zero-copy)
    pub payload: Bytes,
}
