//! Device Gateway factory
//!
//! Builds device sources and the device registry from a `RangeBlueprint`,
//! with rollback when any source fails to build.

use std::collections::HashMap;
use std::path::PathBuf;

use contracts::{DeviceConfig, DeviceRegistry, DeviceRole, DeviceSource, RangeBlueprint};
use tracing::{info, instrument, warn};

use crate::clock::SessionClock;
use crate::error::{GatewayError, Result};
use crate::replay::{ReplayConfig, ReplaySource};
use crate::sim_sensor::{SimSensor, SimSensorConfig};
use crate::sim_timer::{SimTimer, SimTimerConfig};

/// Scripted behavior for simulated devices
#[derive(Debug, Clone, Default)]
pub struct SimScenario {
    /// Timer script (START / SHOT / STOP times)
    pub timer: SimTimerConfig,
    /// Impact times per target label
    pub impacts: HashMap<String, Vec<f64>>,
}

impl SimScenario {
    /// Demo scenario: every sensor target registers an impact shortly
    /// after each shot.
    pub fn demo(blueprint: &RangeBlueprint) -> Self {
        let timer = SimTimerConfig::default();
        let impact_times: Vec<f64> = timer.shot_times.iter().map(|t| t + 0.2).collect();

        let mut impacts = HashMap::new();
        for device in blueprint.sensor_devices() {
            let target = device.target.clone().unwrap_or_else(|| device.id.clone());
            impacts.entry(target).or_insert_with(|| impact_times.clone());
        }

        Self { timer, impacts }
    }
}

/// Where device notifications come from
#[derive(Debug, Clone)]
pub enum SourceMode {
    /// Simulated devices on a shared session clock
    Sim(SimScenario),
    /// Playback of a recorded session
    Replay {
        recording: PathBuf,
        config: ReplayConfig,
    },
}

/// Factory output: registry plus one source per device
pub struct GatewayDevices {
    /// Device lookup tables (roles, targets, timer)
    pub registry: DeviceRegistry,
    /// Built sources paired with their configs
    pub sources: Vec<(DeviceConfig, Box<dyn DeviceSource>)>,
}

/// Build device sources for every device in the blueprint
///
/// # Atomicity
/// If any source fails to build, all previously built sources are
/// stopped and the error is returned.
#[instrument(
    name = "gateway_build_sources",
    skip(blueprint, mode),
    fields(device_count = blueprint.devices.len())
)]
pub fn build_sources(blueprint: &RangeBlueprint, mode: &SourceMode) -> Result<GatewayDevices> {
    if blueprint.primary_timer().is_none() {
        return Err(GatewayError::NoTimer);
    }

    let clock = SessionClock::start();
    let mut registry = DeviceRegistry::new();
    let mut sources: Vec<(DeviceConfig, Box<dyn DeviceSource>)> = Vec::new();

    for device in &blueprint.devices {
        match build_source(device, mode, clock) {
            Ok(source) => {
                registry.register(device.clone());
                sources.push((device.clone(), source));
            }
            Err(e) => {
                warn!(
                    device = %device.id,
                    error = %e,
                    "source build failed, rolling back"
                );
                rollback(&sources);
                return Err(e);
            }
        }
    }

    info!(
        devices = sources.len(),
        timer = ?registry.timer(),
        "gateway sources built"
    );

    Ok(GatewayDevices { registry, sources })
}

#[instrument(
    name = "gateway_build_source",
    skip(device, mode, clock),
    fields(device = %device.id, role = device.role.as_str())
)]
fn build_source(
    device: &DeviceConfig,
    mode: &SourceMode,
    clock: SessionClock,
) -> Result<Box<dyn DeviceSource>> {
    match mode {
        SourceMode::Sim(scenario) => Ok(build_sim_source(device, scenario, clock)),
        SourceMode::Replay { recording, config } => {
            let source = ReplaySource::load(
                recording,
                device.id.as_str(),
                device.role,
                config.clone(),
            )?;
            Ok(Box::new(source))
        }
    }
}

fn build_sim_source(
    device: &DeviceConfig,
    scenario: &SimScenario,
    clock: SessionClock,
) -> Box<dyn DeviceSource> {
    match device.role {
        DeviceRole::Timer => Box::new(SimTimer::new(
            device.id.as_str(),
            scenario.timer.clone(),
            clock,
        )),
        DeviceRole::Sensor => {
            let target = device.target.as_deref().unwrap_or(device.id.as_str());
            let impact_times = scenario.impacts.get(target).cloned().unwrap_or_default();
            Box::new(SimSensor::new(
                device.id.as_str(),
                SimSensorConfig {
                    sample_rate_hz: device.sample_rate_hz,
                    impact_times,
                    ..Default::default()
                },
                clock,
            ))
        }
    }
}

/// Stop every already-built source (ignore state, stopping is idempotent)
fn rollback(sources: &[(DeviceConfig, Box<dyn DeviceSource>)]) {
    warn!(count = sources.len(), "performing rollback");
    for (device, source) in sources {
        info!(device = %device.id, "stopping source");
        source.stop();
    }
}
