//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the session clock (seconds since session start, f64) as primary clock
//! - Timer wire times (centiseconds) are scaled to seconds at decode time

mod blueprint;
mod calibration;
mod device;
mod device_id;
mod device_source;
mod error;
mod event;
mod registry;
mod sample;
mod sink;

pub use blueprint::*;
pub use calibration::CalibrationProfile;
pub use device::*;
pub use device_id::DeviceId;
pub use device_source::{DeviceSource, NotificationCallback};
pub use error::*;
pub use event::*;
pub use registry::DeviceRegistry;
pub use sample::*;
pub use sink::*;
