//! # Ingestion Pipeline
//!
//! Device notification ingestion module.
//!
//! Responsibilities:
//! - Register device notification sources (simulated, replay or real)
//! - Decode wire frames (vibration sensor and shot timer protocols)
//! - Calibrate sensors and run impact detection / timer tracking
//! - Backpressure management and drop policy
//! - Send `RangeEvent`s downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::IngestionPipeline;
//! use contracts::DeviceSource;
//!
//! let mut pipeline = IngestionPipeline::new(256);
//!
//! let source: Box<dyn DeviceSource> = gateway.source_for("plate_a");
//! pipeline.register_device_source(&device_config, source, None);
//!
//! pipeline.start_all();
//! let rx = pipeline.take_receiver().unwrap();
//! while let Ok(event) = rx.recv().await {
//!     // feed the correlation engine
//! }
//! ```

mod adapter;
mod calibration;
mod common;
mod config;
mod detector;
mod device_adapter;
mod device_pipeline;
mod error;
mod pipeline;
mod supervisor;
mod timer_tracker;

pub mod codec;

// Re-exports
pub use adapter::DeviceAdapter;
pub use calibration::Calibrator;
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use contracts::RangeEvent;
pub use detector::ImpactDetector;
pub use device_adapter::GenericDeviceAdapter;
pub use device_pipeline::DevicePipeline;
pub use error::{IngestionError, Result};
pub use pipeline::IngestionPipeline;
pub use supervisor::ReconnectSchedule;
pub use timer_tracker::TimerTracker;
