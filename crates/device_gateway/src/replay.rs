//! Replay source - plays back recorded device notifications
//!
//! Reads a JSONL recording where each line is one raw notification with a
//! hex-encoded payload, and re-emits them with the original timing.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{DeviceId, DeviceRole, DeviceSource, Notification, NotificationCallback};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{GatewayError, Result};

/// Replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    /// Playback speed multiplier (1.0 = original speed)
    pub speed_multiplier: f64,
    /// Loop the recording when it ends
    pub loop_playback: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            speed_multiplier: 1.0,
            loop_playback: false,
        }
    }
}

/// One recorded notification (JSONL line)
#[derive(Debug, Clone, Deserialize)]
struct ReplayRecord {
    device: String,
    role: DeviceRole,
    timestamp: f64,
    payload_hex: String,
}

/// Replay source for a single device
pub struct ReplaySource {
    device_id: DeviceId,
    role: DeviceRole,
    records: Vec<(f64, Bytes)>,
    config: ReplayConfig,
    listening: Arc<AtomicBool>,
    exhausted: Arc<AtomicBool>,
    thread_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ReplaySource {
    /// Load one device's notifications from a JSONL recording
    ///
    /// Records for other devices in the same file are skipped.
    pub fn load(
        recording: &Path,
        device_id: impl Into<DeviceId>,
        role: DeviceRole,
        config: ReplayConfig,
    ) -> Result<Self> {
        let device_id = device_id.into();
        let path = recording_path(recording);
        let file = File::open(&path)
            .map_err(|e| GatewayError::replay_load(path.display().to_string(), e.to_string()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        for (line_no, line) in reader.lines().enumerate() {
            let line = line
                .map_err(|e| GatewayError::replay_load(path.display().to_string(), e.to_string()))?;
            if line.is_empty() {
                continue;
            }

            let record: ReplayRecord = serde_json::from_str(&line).map_err(|e| {
                GatewayError::replay_load(
                    path.display().to_string(),
                    format!("line {}: {}", line_no + 1, e),
                )
            })?;

            if record.device != device_id.as_str() {
                continue;
            }
            if record.role != role {
                warn!(
                    device = %device_id,
                    line = line_no + 1,
                    "record role does not match device role, skipping"
                );
                continue;
            }

            let payload = decode_hex(&record.payload_hex).map_err(|e| {
                GatewayError::replay_load(
                    path.display().to_string(),
                    format!("line {}: {}", line_no + 1, e),
                )
            })?;
            records.push((record.timestamp, Bytes::from(payload)));
        }

        records.sort_by(|a, b| a.0.total_cmp(&b.0));

        info!(
            device = %device_id,
            records = records.len(),
            "loaded replay source"
        );

        Ok(Self {
            device_id,
            role,
            records,
            config,
            listening: Arc::new(AtomicBool::new(false)),
            exhausted: Arc::new(AtomicBool::new(false)),
            thread_handle: std::sync::Mutex::new(None),
        })
    }

    /// Number of loaded records
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

fn recording_path(recording: &Path) -> PathBuf {
    if recording.is_dir() {
        recording.join("notifications.jsonl")
    } else {
        recording.to_path_buf()
    }
}

fn decode_hex(hex: &str) -> std::result::Result<Vec<u8>, String> {
    if hex.len() % 2 != 0 {
        return Err("odd hex length".to_string());
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|e| format!("bad hex byte: {}", e))
        })
        .collect()
}

impl DeviceSource for ReplaySource {
    fn device_id(&self) -> &str {
        self.device_id.as_str()
    }

    fn role(&self) -> DeviceRole {
        self.role
    }

    fn listen(&self, callback: NotificationCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let listening = self.listening.clone();
        let exhausted = self.exhausted.clone();
        let device_id = self.device_id.clone();
        let role = self.role;
        let records = self.records.clone();
        let speed = self.config.speed_multiplier.max(0.1);
        let loop_playback = self.config.loop_playback;

        let handle = thread::spawn(move || {
            debug!(device = %device_id, "replay thread started");

            loop {
                if records.is_empty() {
                    warn!(device = %device_id, "no records to replay");
                    break;
                }

                let start_time = Instant::now();
                let first_timestamp = records[0].0;

                for (timestamp, payload) in &records {
                    if !listening.load(Ordering::Relaxed) {
                        debug!(device = %device_id, "replay stopped");
                        return;
                    }

                    let record_offset = timestamp - first_timestamp;
                    let target_elapsed = Duration::from_secs_f64(record_offset / speed);
                    let actual_elapsed = start_time.elapsed();
                    if target_elapsed > actual_elapsed {
                        thread::sleep(target_elapsed - actual_elapsed);
                    }

                    callback(Notification {
                        device: device_id.clone(),
                        role,
                        timestamp: *timestamp,
                        payload: payload.clone(),
                    });
                }

                if !loop_playback {
                    info!(device = %device_id, "replay completed");
                    break;
                }

                debug!(device = %device_id, "looping replay");
            }

            exhausted.store(true, Ordering::SeqCst);
            listening.store(false, Ordering::SeqCst);
        });

        if let Ok(mut guard) = self.thread_handle.lock() {
            *guard = Some(handle);
        }
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        // Wait for the thread to finish
        if let Ok(mut guard) = self.thread_handle.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::Relaxed)
    }
}
