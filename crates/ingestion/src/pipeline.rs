//! Ingestion Pipeline main entry

use std::collections::HashMap;
use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::{
    CalibrationConfig, DetectionConfig, DeviceConfig, DeviceSource, RangeEvent, ReconnectConfig,
};
use tracing::{debug, info, instrument};

use crate::adapter::DeviceAdapter;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::device_adapter::GenericDeviceAdapter;
use crate::device_pipeline::DevicePipeline;

/// Ingestion Pipeline
///
/// Manages the per-device adapters and provides the single merged event
/// stream the correlation engine consumes.
pub struct IngestionPipeline {
    /// Registered adapters
    adapters: HashMap<String, Box<dyn DeviceAdapter>>,

    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Event sender (shared by all adapters)
    tx: Sender<RangeEvent>,

    /// Event receiver
    rx: Option<Receiver<RangeEvent>>,

    /// Receiver clone handed to adapters for the DropOldest policy
    overflow_rx: Receiver<RangeEvent>,

    /// Default backpressure configuration
    default_config: BackpressureConfig,

    /// Session-wide calibration policy
    calibration: CalibrationConfig,

    /// Session-wide detection thresholds
    detection: DetectionConfig,

    /// Reconnect backoff policy for lost devices
    reconnect: ReconnectConfig,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Event channel capacity
    pub fn new(channel_capacity: usize) -> Self {
        Self::with_config(
            BackpressureConfig {
                channel_capacity,
                ..Default::default()
            },
            CalibrationConfig::default(),
            DetectionConfig::default(),
            ReconnectConfig::default(),
        )
    }

    /// Create with full configuration
    pub fn with_config(
        config: BackpressureConfig,
        calibration: CalibrationConfig,
        detection: DetectionConfig,
        reconnect: ReconnectConfig,
    ) -> Self {
        let (tx, rx) = bounded(config.channel_capacity);

        Self {
            adapters: HashMap::new(),
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            overflow_rx: rx.clone(),
            rx: Some(rx),
            default_config: config,
            calibration,
            detection,
            reconnect,
        }
    }

    /// Register a device notification source
    ///
    /// # Arguments
    /// * `device` - Device configuration
    /// * `source` - Notification source implementing `DeviceSource`
    /// * `config` - Optional backpressure override
    #[instrument(
        name = "ingestion_register_device_source",
        skip(self, device, source, config),
        fields(device = %device.id, role = device.role.as_str())
    )]
    pub fn register_device_source(
        &mut self,
        device: &DeviceConfig,
        source: Box<dyn DeviceSource>,
        config: Option<BackpressureConfig>,
    ) {
        let pipeline = DevicePipeline::new(device, self.calibration, self.detection);
        let adapter = GenericDeviceAdapter::new(
            device.id.clone(),
            device.role,
            source,
            pipeline,
            config.unwrap_or_else(|| self.default_config.clone()),
            self.reconnect,
        );
        debug!(device = %device.id, "registered device source");
        self.adapters.insert(device.id.clone(), Box::new(adapter));
    }

    /// Start all registered devices
    #[instrument(name = "ingestion_start_all", skip(self))]
    pub fn start_all(&self) {
        info!(count = self.adapters.len(), "starting all device adapters");
        for (device_id, adapter) in &self.adapters {
            if !adapter.is_listening() {
                debug!(device = %device_id, "starting adapter");
                adapter.start(
                    self.tx.clone(),
                    self.overflow_rx.clone(),
                    self.metrics.clone(),
                );
            }
        }
    }

    /// Stop all devices
    #[instrument(name = "ingestion_stop_all", skip(self))]
    pub fn stop_all(&self) {
        info!(count = self.adapters.len(), "stopping all device adapters");
        for (device_id, adapter) in &self.adapters {
            if adapter.is_listening() {
                debug!(device = %device_id, "stopping adapter");
                adapter.stop();
            }
        }
    }

    /// Drive time-based work on every adapter (calibration deadlines).
    pub fn tick_all(&self, now: f64) {
        for adapter in self.adapters.values() {
            adapter.tick(now);
        }
    }

    /// Get event stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<RangeEvent>> {
        self.rx.take()
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }

    /// Get registered device count
    pub fn device_count(&self) -> usize {
        self.adapters.len()
    }

    /// Check if specified device is listening
    pub fn is_device_listening(&self, device_id: &str) -> bool {
        self.adapters
            .get(device_id)
            .map(|a| a.is_listening())
            .unwrap_or(false)
    }
}

impl Drop for IngestionPipeline {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_creation() {
        let pipeline = IngestionPipeline::new(100);
        assert_eq!(pipeline.device_count(), 0);
    }

    #[test]
    fn test_take_receiver_once() {
        let mut pipeline = IngestionPipeline::new(100);
        assert!(pipeline.take_receiver().is_some());
        assert!(pipeline.take_receiver().is_none());
    }
}
