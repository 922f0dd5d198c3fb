//! Configuration validation
//!
//! Rules:
//! - device id unique
//! - device addr unique
//! - at least one timer device
//! - sample_rate_hz > 0
//! - onset_threshold < peak_threshold (strict)
//! - excellent_s < good_s < window_s (strict)
//! - calibration sample_target > 0
//! - sink required fields present

use std::collections::HashSet;

use contracts::{ContractError, RangeBlueprint};

/// Validate a RangeBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    validate_device_ids(blueprint)?;
    validate_device_addrs(blueprint)?;
    validate_roles(blueprint)?;
    validate_sample_rates(blueprint)?;
    validate_detection(blueprint)?;
    validate_correlation(blueprint)?;
    validate_calibration(blueprint)?;
    validate_sinks(blueprint)?;
    Ok(())
}

/// Device id uniqueness
fn validate_device_ids(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for device in &blueprint.devices {
        if !seen.insert(&device.id) {
            return Err(ContractError::config_validation(
                format!("devices[id={}]", device.id),
                "duplicate device id",
            ));
        }
    }
    Ok(())
}

/// Hardware address uniqueness
fn validate_device_addrs(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for device in &blueprint.devices {
        if !seen.insert(&device.addr) {
            return Err(ContractError::config_validation(
                format!("devices[{}].addr", device.id),
                format!("duplicate device addr '{}'", device.addr),
            ));
        }
    }
    Ok(())
}

/// A session needs a shot timer to correlate against
fn validate_roles(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    if blueprint.primary_timer().is_none() {
        return Err(ContractError::config_validation(
            "devices",
            "at least one device with role 'timer' is required",
        ));
    }
    Ok(())
}

/// Sample rates
fn validate_sample_rates(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    for device in &blueprint.devices {
        if device.sample_rate_hz <= 0.0 {
            return Err(ContractError::config_validation(
                format!("devices[{}].sample_rate_hz", device.id),
                format!("sample_rate_hz must be > 0, got {}", device.sample_rate_hz),
            ));
        }
    }
    Ok(())
}

/// Detection thresholds
fn validate_detection(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    let detection = &blueprint.detection;

    if detection.onset_threshold >= detection.peak_threshold {
        return Err(ContractError::config_validation(
            "detection.onset_threshold / detection.peak_threshold",
            format!(
                "onset_threshold ({}) must be < peak_threshold ({})",
                detection.onset_threshold, detection.peak_threshold
            ),
        ));
    }

    Ok(())
}

/// Correlation window and quality tiers
fn validate_correlation(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    let correlation = &blueprint.correlation;

    if !(correlation.excellent_s < correlation.good_s && correlation.good_s < correlation.window_s)
    {
        return Err(ContractError::config_validation(
            "correlation",
            format!(
                "quality tiers must be ascending: excellent_s ({}) < good_s ({}) < window_s ({})",
                correlation.excellent_s, correlation.good_s, correlation.window_s
            ),
        ));
    }

    if correlation.buffer_size == 0 {
        return Err(ContractError::config_validation(
            "correlation.buffer_size",
            "buffer_size must be > 0",
        ));
    }

    Ok(())
}

/// Calibration policy
fn validate_calibration(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    if blueprint.calibration.sample_target == 0 {
        return Err(ContractError::config_validation(
            "calibration.sample_target",
            "sample_target must be > 0",
        ));
    }
    Ok(())
}

/// Sink configuration
fn validate_sinks(blueprint: &RangeBlueprint) -> Result<(), ContractError> {
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name cannot be empty",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}
