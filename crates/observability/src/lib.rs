//! # Observability
//!
//! Tracing setup and Prometheus metrics export.
//!
//! The tracing side installs a single global subscriber with a
//! caller-chosen filter and format; the metrics side exposes a
//! Prometheus endpoint plus the correlation aggregation helpers in
//! [`metrics`].

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

pub use tracing_subscriber::EnvFilter;

// Re-exports
pub use crate::metrics::{
    record_buffer_depth, record_correlation_metrics, record_event_received,
    record_record_dispatched, CorrelationMetricsAggregator, MetricsSummary, RunningStats,
    StatsSummary,
};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human-readable multi-line format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Install the global tracing subscriber.
///
/// The caller owns filter policy (verbosity flags, `RUST_LOG`); this
/// only wires the chosen format under it. Fails if a subscriber is
/// already installed.
pub fn init_tracing(format: LogFormat, filter: EnvFilter) -> Result<()> {
    let fmt_layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to install tracing subscriber")
}

/// Expose Prometheus metrics on `0.0.0.0:<port>`.
pub fn serve_metrics(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("failed to install Prometheus recorder")?;

    tracing::info!(port, "metrics endpoint up");
    Ok(())
}
