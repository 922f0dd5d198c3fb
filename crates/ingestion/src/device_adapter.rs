//! Generic device adapter
//!
//! Unified adapter over the `DeviceSource` trait. Each notification is
//! run through the per-device pipeline under a short-lived mutex (one
//! device, one callback thread, no contention) and the resulting events
//! are pushed onto the shared channel.
//!
//! The adapter also supervises its source: a source that stops
//! listening without being exhausted is reported as lost and retried on
//! the reconnect backoff schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_channel::{Receiver, Sender};
use contracts::{
    DeviceRole, DeviceSource, DeviceStatus, DeviceStatusKind, NotificationCallback, RangeEvent,
    ReconnectConfig,
};
use tracing::{debug, info, trace, warn};

use crate::adapter::DeviceAdapter;
use crate::common::send_event;
use crate::config::{BackpressureConfig, IngestionMetrics};
use crate::device_pipeline::DevicePipeline;
use crate::supervisor::ReconnectSchedule;

/// Generic device adapter
///
/// Bridges `DeviceSource` (device_gateway side) to the event channel
/// (correlation side).
pub struct GenericDeviceAdapter {
    device_id: String,
    role: DeviceRole,
    source: Box<dyn DeviceSource>,
    pipeline: Arc<Mutex<DevicePipeline>>,
    config: BackpressureConfig,
    reconnect: ReconnectConfig,
    listening: Arc<AtomicBool>,
    output: Mutex<Option<OutputHandle>>,
    callback: Mutex<Option<NotificationCallback>>,
    link: Mutex<LinkState>,
}

#[derive(Clone)]
struct OutputHandle {
    tx: Sender<RangeEvent>,
    overflow_rx: Receiver<RangeEvent>,
    metrics: Arc<IngestionMetrics>,
}

/// Source link supervision state
enum LinkState {
    /// Source is (believed) streaming
    Up,
    /// Source dropped; next retry is due at `retry_at`
    Down {
        schedule: ReconnectSchedule,
        retry_at: f64,
    },
    /// Source exhausted or retry budget spent; no further attempts
    Settled,
}

impl GenericDeviceAdapter {
    /// Create a new generic adapter
    pub fn new(
        device_id: String,
        role: DeviceRole,
        source: Box<dyn DeviceSource>,
        pipeline: DevicePipeline,
        config: BackpressureConfig,
        reconnect: ReconnectConfig,
    ) -> Self {
        Self {
            device_id,
            role,
            source,
            pipeline: Arc::new(Mutex::new(pipeline)),
            config,
            reconnect,
            listening: Arc::new(AtomicBool::new(false)),
            output: Mutex::new(None),
            callback: Mutex::new(None),
            link: Mutex::new(LinkState::Up),
        }
    }

    fn emit_status(&self, handle: &OutputHandle, kind: DeviceStatusKind, now: f64) {
        let event = RangeEvent::Status(DeviceStatus {
            device: self.device_id.as_str().into(),
            role: self.role,
            kind,
            timestamp: now,
        });
        send_event(
            &handle.tx,
            &handle.overflow_rx,
            event,
            &handle.metrics,
            &self.device_id,
            self.config.drop_policy,
        );
    }

    /// Watch the source link and drive reconnect attempts.
    fn supervise(&self, now: f64, handle: &OutputHandle) {
        let Ok(mut link) = self.link.lock() else {
            return;
        };

        match &mut *link {
            LinkState::Up => {
                if self.source.is_listening() {
                    return;
                }
                if self.source.is_exhausted() {
                    debug!(device = %self.device_id, "source exhausted");
                    *link = LinkState::Settled;
                    return;
                }

                warn!(device = %self.device_id, "device link lost");
                self.emit_status(handle, DeviceStatusKind::Lost, now);

                let mut schedule = ReconnectSchedule::new(self.reconnect);
                *link = match schedule.next_delay() {
                    Some(delay) => LinkState::Down {
                        schedule,
                        retry_at: now + delay.as_secs_f64(),
                    },
                    None => LinkState::Settled,
                };
            }
            LinkState::Down { schedule, retry_at } => {
                if now < *retry_at {
                    return;
                }

                let callback = self
                    .callback
                    .lock()
                    .ok()
                    .and_then(|guard| guard.clone());
                let Some(callback) = callback else {
                    return;
                };

                debug!(
                    device = %self.device_id,
                    attempt = schedule.attempts(),
                    "reconnect attempt"
                );
                self.source.listen(callback);

                if self.source.is_listening() {
                    info!(device = %self.device_id, "device reconnected");
                    self.emit_status(handle, DeviceStatusKind::Connected, now);
                    *link = LinkState::Up;
                } else if let Some(delay) = schedule.next_delay() {
                    *retry_at = now + delay.as_secs_f64();
                } else {
                    warn!(
                        device = %self.device_id,
                        attempts = schedule.attempts(),
                        "reconnect budget spent, giving up"
                    );
                    *link = LinkState::Settled;
                }
            }
            LinkState::Settled => {}
        }
    }
}

impl DeviceAdapter for GenericDeviceAdapter {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn role(&self) -> DeviceRole {
        self.role
    }

    fn start(
        &self,
        tx: Sender<RangeEvent>,
        overflow_rx: Receiver<RangeEvent>,
        metrics: Arc<IngestionMetrics>,
    ) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let handle = OutputHandle {
            tx: tx.clone(),
            overflow_rx: overflow_rx.clone(),
            metrics: metrics.clone(),
        };
        if let Ok(mut output) = self.output.lock() {
            *output = Some(handle.clone());
        }
        if let Ok(mut link) = self.link.lock() {
            *link = LinkState::Up;
        }

        let device_id = self.device_id.clone();
        let drop_policy = self.config.drop_policy;
        let listening = self.listening.clone();
        let pipeline = self.pipeline.clone();

        debug!(device = %device_id, "starting device adapter");

        let callback: NotificationCallback = Arc::new(move |notification| {
            if !listening.load(Ordering::Relaxed) {
                return;
            }

            metrics.record_received();
            trace!(device = %device_id, bytes = notification.payload.len(), "notification");

            let events = {
                let Ok(mut pipeline) = pipeline.lock() else {
                    return;
                };
                let before = pipeline.decode_errors();
                let events =
                    pipeline.handle_notification(notification.timestamp, &notification.payload);
                for _ in before..pipeline.decode_errors() {
                    metrics.record_decode_error();
                }
                events
            };

            for event in events {
                send_event(&tx, &overflow_rx, event, &metrics, &device_id, drop_policy);
            }
        });

        if let Ok(mut stored) = self.callback.lock() {
            *stored = Some(callback.clone());
        }

        self.source.listen(callback);
        self.emit_status(&handle, DeviceStatusKind::Connected, 0.0);
    }

    fn stop(&self) {
        if self.listening.swap(false, Ordering::SeqCst) {
            debug!(device = %self.device_id, "stopping device adapter");
            self.source.stop();
        }
    }

    fn tick(&self, now: f64) {
        if !self.listening.load(Ordering::Relaxed) {
            return;
        }

        let Ok(output) = self.output.lock() else {
            return;
        };
        let Some(handle) = output.clone() else {
            return;
        };
        drop(output);

        let event = {
            let Ok(mut pipeline) = self.pipeline.lock() else {
                return;
            };
            pipeline.poll_calibration(now)
        };

        if let Some(event) = event {
            send_event(
                &handle.tx,
                &handle.overflow_rx,
                event,
                &handle.metrics,
                &self.device_id,
                self.config.drop_policy,
            );
        }

        self.supervise(now, &handle);
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}
