//! # Device Gateway
//!
//! Device source module.
//!
//! Responsibilities:
//! - Build `DeviceSource`s from a `RangeBlueprint` (with rollback)
//! - Provide simulated timer and sensor devices on a shared session clock
//! - Replay recorded sessions from JSONL files

pub mod clock;
pub mod error;
pub mod factory;
pub mod replay;
pub mod sim_sensor;
pub mod sim_timer;
pub mod wire;

pub use clock::SessionClock;
pub use contracts::{DeviceRegistry, DeviceSource, RangeBlueprint};
pub use error::{GatewayError, Result};
pub use factory::{build_sources, GatewayDevices, SimScenario, SourceMode};
pub use replay::{ReplayConfig, ReplaySource};
pub use sim_sensor::{SimSensor, SimSensorConfig};
pub use sim_timer::{SimTimer, SimTimerConfig};
