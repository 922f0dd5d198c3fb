//! Pipeline statistics and metrics.

use std::time::Duration;

use observability::CorrelationMetricsAggregator;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total correlated records emitted
    pub records_emitted: u64,

    /// Total events received from devices
    pub events_received: u64,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Number of devices that were active
    pub active_devices: usize,

    /// Number of sinks that received data
    pub active_sinks: usize,

    /// Correlation metrics aggregator
    pub correlation_metrics: CorrelationMetricsAggregator,
}

impl PipelineStats {
    /// Records emitted per second
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_emitted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Pipeline Statistics ===");
        println!("Duration: {:.2}s", self.duration.as_secs_f64());
        println!("Events received: {}", self.events_received);
        println!("Records emitted: {}", self.records_emitted);
        println!("Records/sec: {:.2}", self.records_per_sec());
        println!("Active devices: {}", self.active_devices);
        println!("Active sinks: {}", self.active_sinks);
        println!();
        print!("{}", self.correlation_metrics.summary());
        println!();
    }
}
