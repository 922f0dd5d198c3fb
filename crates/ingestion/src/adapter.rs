//! Device adapter trait

use std::sync::Arc;

use async_channel::{Receiver, Sender};
use contracts::{DeviceRole, RangeEvent};

use crate::config::IngestionMetrics;

/// Device adapter trait
///
/// One implementation per device, responsible for:
/// 1. Registering the device notification callback
/// 2. Decoding notifications into events (via the per-device pipeline)
/// 3. Sending events to the shared channel (handling backpressure)
/// 4. Supervising the source and reconnecting a lost device
pub trait DeviceAdapter: Send + Sync {
    /// Get device ID
    fn device_id(&self) -> &str;

    /// Get device role
    fn role(&self) -> DeviceRole;

    /// Start collecting notifications
    ///
    /// # Arguments
    /// * `tx` - Event channel sender
    /// * `overflow_rx` - Receiver clone on the same channel, used by the
    ///   `DropOldest` policy to pop the head of the shared queue
    /// * `metrics` - Shared ingestion metrics
    fn start(
        &self,
        tx: Sender<RangeEvent>,
        overflow_rx: Receiver<RangeEvent>,
        metrics: Arc<IngestionMetrics>,
    );

    /// Stop collecting notifications
    fn stop(&self);

    /// Drive time-based work (calibration deadlines, link supervision)
    fn tick(&self, now: f64);

    /// Check if the device is listening
    fn is_listening(&self) -> bool;
}
