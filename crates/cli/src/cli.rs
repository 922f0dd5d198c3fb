//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Range Fuser - shot timer and target sensor fusion pipeline
#[derive(Parser, Debug)]
#[command(
    name = "range-fuser",
    author,
    version,
    about = "Shot timer / vibration sensor fusion pipeline",
    long_about = "Correlates shot timer events with vibration target sensor impacts.\n\n\
                  Builds device sources from configuration, calibrates and decodes \n\
                  sensor streams, correlates shots with impacts, and dispatches \n\
                  scored records to configured sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "RANGE_FUSER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "RANGE_FUSER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the fusion pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "session.toml",
        env = "RANGE_FUSER_CONFIG"
    )]
    pub config: PathBuf,

    /// Maximum number of correlated records to produce (0 = unlimited)
    #[arg(long, default_value = "0", env = "RANGE_FUSER_MAX_RECORDS")]
    pub max_records: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "RANGE_FUSER_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "RANGE_FUSER_METRICS_PORT")]
    pub metrics_port: u16,

    /// Replay a recorded session instead of simulating devices
    #[arg(long, env = "RANGE_FUSER_REPLAY")]
    pub replay: Option<PathBuf>,

    /// Replay speed multiplier (1.0 = original speed)
    #[arg(long, default_value = "1.0", env = "RANGE_FUSER_REPLAY_SPEED")]
    pub replay_speed: f64,

    /// Loop replay when finished
    #[arg(long)]
    pub replay_loop: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "session.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed device information
    #[arg(long)]
    pub devices: bool,

    /// Show sink configuration
    #[arg(long)]
    pub sinks: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
