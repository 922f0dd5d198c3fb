//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    session: SessionInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    devices: Vec<DeviceInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sinks: Vec<SinkInfo>,
    correlation: CorrelationInfo,
}

#[derive(Serialize)]
struct SessionInfo {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize)]
struct DeviceInfo {
    id: String,
    addr: String,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    sample_rate_hz: f64,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
}

#[derive(Serialize)]
struct CorrelationInfo {
    window_s: f64,
    excellent_s: f64,
    good_s: f64,
    buffer_size: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &contracts::RangeBlueprint, args: &InfoArgs) -> ConfigInfo {
    let devices = if args.devices {
        blueprint
            .devices
            .iter()
            .map(|d| DeviceInfo {
                id: d.id.clone(),
                addr: d.addr.clone(),
                role: d.role.as_str().to_string(),
                target: d.target.clone(),
                sample_rate_hz: d.sample_rate_hz,
            })
            .collect()
    } else {
        Vec::new()
    };

    let sinks = if args.sinks {
        blueprint
            .sinks
            .iter()
            .map(|s| SinkInfo {
                name: s.name.clone(),
                sink_type: format!("{:?}", s.sink_type),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        session: SessionInfo {
            name: blueprint.session.name.clone(),
            description: blueprint.session.description.clone(),
        },
        devices,
        sinks,
        correlation: CorrelationInfo {
            window_s: blueprint.correlation.window_s,
            excellent_s: blueprint.correlation.excellent_s,
            good_s: blueprint.correlation.good_s,
            buffer_size: blueprint.correlation.buffer_size,
        },
    }
}

fn print_config_info(blueprint: &contracts::RangeBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Range Fuser Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    // Session info
    println!("📍 Session");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Name: {}", blueprint.session.name);
    match &blueprint.session.description {
        Some(description) => {
            println!("   └─ Description: {}", description);
        }
        None => {
            println!("   └─ Description: (none)");
        }
    }

    // Devices
    println!("\n🎯 Devices ({})", blueprint.devices.len());
    for (i, device) in blueprint.devices.iter().enumerate() {
        let is_last = i == blueprint.devices.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} ({})", prefix, device.id, device.role.as_str());

        if args.devices {
            println!("   {}  ├─ Addr: {}", child_prefix, device.addr);
            println!(
                "   {}  ├─ Sample rate: {} Hz",
                child_prefix, device.sample_rate_hz
            );
            match &device.target {
                Some(target) => {
                    println!("   {}  └─ Target: {}", child_prefix, target);
                }
                None => {
                    println!("   {}  └─ Target: (device id)", child_prefix);
                }
            }
        }
    }

    // Correlation settings
    let correlation = &blueprint.correlation;
    println!("\n⚙️  Correlation Settings");
    println!("   ├─ Window: +/-{}s", correlation.window_s);
    println!("   ├─ Excellent: <= {}s", correlation.excellent_s);
    println!("   ├─ Good: <= {}s", correlation.good_s);
    println!("   └─ Impact buffer: {}", correlation.buffer_size);

    // Sinks
    if !blueprint.sinks.is_empty() {
        println!("\n📤 Sinks ({})", blueprint.sinks.len());
        for (i, sink) in blueprint.sinks.iter().enumerate() {
            let is_last = i == blueprint.sinks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!("   {} {} ({:?})", prefix, sink.name, sink.sink_type);
        }
    }

    println!();
}
