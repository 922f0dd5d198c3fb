//! Per-device processing pipeline.
//!
//! One instance per device, fed raw notifications in arrival order.
//! Sensors run calibration then impact detection; timers run the protocol
//! tracker. Partial frames split across notifications are carried in a
//! small reassembly buffer.

use contracts::{
    CalibrationConfig, DecodeError, DetectionConfig, DeviceConfig, DeviceId, DeviceRole,
    DeviceStatus, DeviceStatusKind, RangeEvent,
};
use tracing::{debug, warn};

use crate::calibration::Calibrator;
use crate::codec::{timer, vibration};
use crate::detector::ImpactDetector;
use crate::timer_tracker::TimerTracker;

/// Reassembly buffer cap; beyond this the carry is garbage, not a split
/// frame, and gets discarded.
const MAX_CARRY_BYTES: usize = 4096;

/// Per-device decode and event extraction pipeline.
pub struct DevicePipeline {
    device: DeviceId,
    role: DeviceRole,
    carry: Vec<u8>,
    stage: RoleStage,
    decode_errors: u64,
}

enum RoleStage {
    Timer(TimerTracker),
    Sensor(SensorStage),
}

struct SensorStage {
    target: String,
    detection: DetectionConfig,
    calibrator: Calibrator,
    detector: Option<ImpactDetector>,
}

impl DevicePipeline {
    /// Build the pipeline for one configured device.
    pub fn new(
        config: &DeviceConfig,
        calibration: CalibrationConfig,
        detection: DetectionConfig,
    ) -> Self {
        let device = DeviceId::from(config.id.as_str());
        let stage = match config.role {
            DeviceRole::Timer => RoleStage::Timer(TimerTracker::new(device.clone())),
            DeviceRole::Sensor => RoleStage::Sensor(SensorStage {
                target: config.target.clone().unwrap_or_else(|| config.id.clone()),
                detection,
                calibrator: Calibrator::new(device.clone(), calibration),
                detector: None,
            }),
        };

        Self {
            device,
            role: config.role,
            carry: Vec::new(),
            stage,
            decode_errors: 0,
        }
    }

    /// Device this pipeline belongs to.
    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Decode failures seen so far.
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors
    }

    /// True for sensors that have finished (or fallen back) calibration.
    pub fn is_calibrated(&self) -> bool {
        match &self.stage {
            RoleStage::Timer(_) => true,
            RoleStage::Sensor(stage) => stage.calibrator.is_complete(),
        }
    }

    /// Process one notification payload; returns emitted events in order.
    pub fn handle_notification(&mut self, timestamp: f64, payload: &[u8]) -> Vec<RangeEvent> {
        if self.carry.len() + payload.len() > MAX_CARRY_BYTES {
            warn!(
                device = %self.device,
                carry = self.carry.len(),
                "reassembly buffer overflow, discarding carry"
            );
            self.carry.clear();
        }
        self.carry.extend_from_slice(payload);

        match self.role {
            DeviceRole::Timer => self.drain_timer_frames(timestamp),
            DeviceRole::Sensor => self.drain_sensor_frames(timestamp),
        }
    }

    /// Drive the calibration deadline; emits a degraded-status event when
    /// the fallback baseline kicks in.
    pub fn poll_calibration(&mut self, now: f64) -> Option<RangeEvent> {
        let RoleStage::Sensor(stage) = &mut self.stage else {
            return None;
        };

        let profile = stage.calibrator.poll_timeout(now)?;
        stage.detector = Some(ImpactDetector::new(
            self.device.clone(),
            stage.target.clone(),
            stage.detection,
            profile,
        ));

        Some(RangeEvent::Status(DeviceStatus {
            device: self.device.clone(),
            role: self.role,
            kind: DeviceStatusKind::Degraded,
            timestamp: now,
        }))
    }

    fn drain_timer_frames(&mut self, timestamp: f64) -> Vec<RangeEvent> {
        let RoleStage::Timer(tracker) = &mut self.stage else {
            unreachable!("timer drain on sensor stage");
        };

        let mut events = Vec::new();
        let mut pos = 0;

        while self.carry.len() - pos >= timer::TIMER_FRAME_LEN {
            match timer::decode_frame(&self.carry[pos..]) {
                Ok((frame, used)) => {
                    pos += used;
                    if let Some(event) = tracker.push(timestamp, &frame) {
                        events.push(RangeEvent::Timer(event));
                    }
                }
                Err(DecodeError::BadDiscriminator { code }) => {
                    // Known frame size, unknown code (vendor keep-alive)
                    debug!(device = %self.device, code, "dropping unknown timer frame");
                    self.decode_errors += 1;
                    metrics::counter!("ingestion_decode_errors_total").increment(1);
                    pos += timer::TIMER_FRAME_LEN;
                }
                Err(err) => {
                    debug!(device = %self.device, %err, "timer resync, skipping byte");
                    self.decode_errors += 1;
                    metrics::counter!("ingestion_decode_errors_total").increment(1);
                    pos += 1;
                }
            }
        }

        self.carry.drain(..pos);
        events
    }

    fn drain_sensor_frames(&mut self, timestamp: f64) -> Vec<RangeEvent> {
        let RoleStage::Sensor(stage) = &mut self.stage else {
            unreachable!("sensor drain on timer stage");
        };

        let scan = vibration::scan(&self.carry);
        self.carry.drain(..scan.consumed);

        let mut events = Vec::new();
        for sample in &scan.samples {
            if let Some(detector) = &mut stage.detector {
                if let Some(impact) = detector.push(timestamp, sample.velocity) {
                    events.push(RangeEvent::Impact(impact));
                }
                continue;
            }

            if let Some(profile) = stage.calibrator.feed(timestamp, sample) {
                stage.detector = Some(ImpactDetector::new(
                    self.device.clone(),
                    stage.target.clone(),
                    stage.detection,
                    profile,
                ));
                events.push(RangeEvent::Status(DeviceStatus {
                    device: self.device.clone(),
                    role: self.role,
                    kind: DeviceStatusKind::Calibrated,
                    timestamp,
                }));
            }
        }

        events
    }
}
