//! DeviceRegistry - Device Gateway output
//!
//! Session device topology, built once at startup and injected into the
//! components that need lookups. There is no global registry; ownership
//! is explicit.

use std::collections::HashMap;

use crate::{ContractError, DeviceConfig, DeviceId, DeviceRole};

/// Resolved device topology for one session.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    /// Device ID -> configuration
    devices: HashMap<DeviceId, DeviceConfig>,

    /// Sensor ID -> target label
    sensor_to_target: HashMap<DeviceId, String>,

    /// The timer driving the session
    timer: Option<DeviceId>,
}

impl DeviceRegistry {
    /// Create empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device.
    ///
    /// The first timer registered becomes the session timer. Sensors
    /// without a configured target label fall back to their own id.
    pub fn register(&mut self, config: DeviceConfig) {
        let id = DeviceId::from(config.id.as_str());
        match config.role {
            DeviceRole::Timer => {
                if self.timer.is_none() {
                    self.timer = Some(id.clone());
                }
            }
            DeviceRole::Sensor => {
                let target = config.target.clone().unwrap_or_else(|| config.id.clone());
                self.sensor_to_target.insert(id.clone(), target);
            }
        }
        self.devices.insert(id, config);
    }

    /// Look up a device configuration.
    pub fn get(&self, id: &str) -> Option<&DeviceConfig> {
        self.devices.get(id)
    }

    /// Look up a device, erroring when absent.
    pub fn require(&self, id: &str) -> Result<&DeviceConfig, ContractError> {
        self.devices.get(id).ok_or_else(|| ContractError::DeviceNotFound {
            device: id.to_string(),
        })
    }

    /// Target label for a sensor.
    pub fn target_of(&self, sensor: &str) -> Option<&str> {
        self.sensor_to_target.get(sensor).map(String::as_str)
    }

    /// The session timer, if any.
    pub fn timer(&self) -> Option<&DeviceId> {
        self.timer.as_ref()
    }

    /// All sensor IDs.
    pub fn sensor_ids(&self) -> impl Iterator<Item = &DeviceId> {
        self.sensor_to_target.keys()
    }

    /// All registered device IDs (for teardown).
    pub fn all_device_ids(&self) -> Vec<DeviceId> {
        self.devices.keys().cloned().collect()
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, role: DeviceRole, target: Option<&str>) -> DeviceConfig {
        DeviceConfig {
            id: id.to_string(),
            addr: format!("addr-{id}"),
            role,
            target: target.map(str::to_string),
            sample_rate_hz: 50.0,
        }
    }

    #[test]
    fn registers_timer_and_sensors() {
        let mut registry = DeviceRegistry::new();
        registry.register(device("timer1", DeviceRole::Timer, None));
        registry.register(device("plate_a", DeviceRole::Sensor, Some("A")));
        registry.register(device("plate_b", DeviceRole::Sensor, None));

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.timer().map(|id| id.as_str()), Some("timer1"));
        assert_eq!(registry.target_of("plate_a"), Some("A"));
        // No configured target falls back to the sensor id
        assert_eq!(registry.target_of("plate_b"), Some("plate_b"));
    }

    #[test]
    fn first_timer_wins() {
        let mut registry = DeviceRegistry::new();
        registry.register(device("timer1", DeviceRole::Timer, None));
        registry.register(device("timer2", DeviceRole::Timer, None));
        assert_eq!(registry.timer().map(|id| id.as_str()), Some("timer1"));
    }

    #[test]
    fn require_reports_missing_device() {
        let registry = DeviceRegistry::new();
        let err = registry.require("ghost").unwrap_err();
        assert!(matches!(err, ContractError::DeviceNotFound { .. }));
    }
}
