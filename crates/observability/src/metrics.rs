//! Correlation metrics collection
//!
//! Collects and aggregates runtime metrics from emitted `CorrelatedRecord`s.

use contracts::CorrelatedRecord;
use metrics::{counter, gauge, histogram};

/// Record metrics from a CorrelatedRecord
///
/// Call this for every record the correlation engine emits.
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_correlation_metrics;
///
/// for record in engine.advance(now) {
///     record_correlation_metrics(&record);
///     // ...
/// }
/// ```
pub fn record_correlation_metrics(record: &CorrelatedRecord) {
    // Record counter
    counter!("range_fuser_records_total").increment(1);

    // Record id (for detecting gaps)
    gauge!("range_fuser_last_record_id").set(record.record_id as f64);

    // Quality tier counters (control records carry no quality)
    let quality = record.quality.map(|q| q.as_str()).unwrap_or("control");
    counter!("range_fuser_records_by_quality_total", "quality" => quality).increment(1);

    // Shot-to-impact offset (seconds -> milliseconds)
    if let Some(offset) = record.offset_s {
        histogram!("range_fuser_offset_ms").record(offset.abs() * 1000.0);
        gauge!("range_fuser_last_offset_ms").set(offset * 1000.0);
    }

    // Candidate pool and pending depth at finalization time
    histogram!("range_fuser_candidates_considered").record(record.meta.candidates_considered as f64);
    gauge!("range_fuser_pending_shots").set(record.meta.pending_depth as f64);

    // Lifetime buffer drop / reorder totals
    gauge!("range_fuser_impacts_dropped").set(record.meta.dropped_count as f64);
    gauge!("range_fuser_impacts_out_of_order").set(record.meta.out_of_order_count as f64);

    // Per-target hit counters
    if let Some(impact) = &record.impact {
        counter!(
            "range_fuser_hits_total",
            "target" => impact.target.clone()
        )
        .increment(1);
    }
}

/// Record an event arriving off the merged stream
pub fn record_event_received(device: &str, kind: &str) {
    counter!(
        "range_fuser_events_received_total",
        "device" => device.to_string(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a record handed to a sink
pub fn record_record_dispatched(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "range_fuser_records_dispatched_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record impact buffer depth
pub fn record_buffer_depth(depth: usize) {
    gauge!("range_fuser_impact_buffer_depth").set(depth as f64);
}

/// Correlation metrics aggregator
///
/// Aggregates metrics in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct CorrelationMetricsAggregator {
    /// Total records seen
    pub total_records: u64,

    /// Control records (START / STOP bypass)
    pub control_records: u64,

    /// Shot records with no candidate impact
    pub no_impact: u64,

    /// Records per quality tier
    pub quality_counts: std::collections::HashMap<&'static str, u64>,

    /// Hits per target label
    pub target_counts: std::collections::HashMap<String, u64>,

    /// Absolute offset statistics (milliseconds)
    pub offset_stats: RunningStats,

    /// Lifetime impact buffer drops (last observed)
    pub impacts_dropped: u64,

    /// Lifetime out-of-order impacts (last observed)
    pub impacts_out_of_order: u64,
}

impl CorrelationMetricsAggregator {
    /// Create a new aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Update aggregate statistics
    pub fn update(&mut self, record: &CorrelatedRecord) {
        self.total_records += 1;

        match record.quality {
            None => self.control_records += 1,
            Some(quality) => {
                *self.quality_counts.entry(quality.as_str()).or_insert(0) += 1;
                if record.impact.is_none() {
                    self.no_impact += 1;
                }
            }
        }

        if let Some(offset) = record.offset_s {
            self.offset_stats.push(offset.abs() * 1000.0);
        }

        if let Some(impact) = &record.impact {
            *self
                .target_counts
                .entry(impact.target.clone())
                .or_insert(0) += 1;
        }

        // meta carries lifetime counters, keep the latest
        self.impacts_dropped = record.meta.dropped_count as u64;
        self.impacts_out_of_order = record.meta.out_of_order_count as u64;
    }

    /// Generate summary report
    pub fn summary(&self) -> MetricsSummary {
        let shot_records = self.total_records - self.control_records;
        let paired = shot_records.saturating_sub(self.no_impact);

        MetricsSummary {
            total_records: self.total_records,
            control_records: self.control_records,
            shot_records,
            paired_records: paired,
            no_impact: self.no_impact,
            pairing_rate: if shot_records > 0 {
                paired as f64 / shot_records as f64 * 100.0
            } else {
                0.0
            },
            quality_counts: self.quality_counts.clone(),
            target_counts: self.target_counts.clone(),
            offset_ms: StatsSummary::from(&self.offset_stats),
            impacts_dropped: self.impacts_dropped,
            impacts_out_of_order: self.impacts_out_of_order,
        }
    }

    /// Reset statistics
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Metrics summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_records: u64,
    pub control_records: u64,
    pub shot_records: u64,
    pub paired_records: u64,
    pub no_impact: u64,
    pub pairing_rate: f64,
    pub quality_counts: std::collections::HashMap<&'static str, u64>,
    pub target_counts: std::collections::HashMap<String, u64>,
    pub offset_ms: StatsSummary,
    pub impacts_dropped: u64,
    pub impacts_out_of_order: u64,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Correlation Summary ===")?;
        writeln!(f, "Total records: {}", self.total_records)?;
        writeln!(f, "Control records: {}", self.control_records)?;
        writeln!(
            f,
            "Shots paired: {}/{} ({:.2}%)",
            self.paired_records, self.shot_records, self.pairing_rate
        )?;

        for tier in ["excellent", "good", "fair", "no_impact"] {
            if let Some(count) = self.quality_counts.get(tier) {
                writeln!(f, "  {}: {}", tier, count)?;
            }
        }

        writeln!(f, "Offset (ms): {}", self.offset_ms)?;
        writeln!(f, "Impacts dropped: {}", self.impacts_dropped)?;
        writeln!(f, "Impacts out of order: {}", self.impacts_out_of_order)?;

        if !self.target_counts.is_empty() {
            writeln!(f, "Hits per target:")?;
            for (target, count) in &self.target_counts {
                writeln!(f, "  {}: {}", target, count)?;
            }
        }

        Ok(())
    }
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a new value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// Sample count
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Mean
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// Standard deviation
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Minimum
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Maximum
    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        CorrelationMeta, CorrelationQuality, ImpactEvent, TimerEvent, TimerEventKind,
    };

    fn make_record(
        record_id: u64,
        quality: Option<CorrelationQuality>,
        offset_s: Option<f64>,
    ) -> CorrelatedRecord {
        let impact = offset_s.map(|offset| ImpactEvent {
            sensor: "plate_a".into(),
            target: "A".to_string(),
            onset_ts: 5.0 + offset - 0.02,
            peak_ts: 5.0 + offset,
            peak_magnitude: 400.0,
            duration_s: 0.08,
            confidence: 0.9,
        });

        CorrelatedRecord {
            record_id,
            timer: TimerEvent {
                kind: TimerEventKind::Shot,
                timestamp: 5.0,
                sequence: 1,
                split_s: 0.8,
                cumulative_s: 5.0,
                string_number: 1,
            },
            impact,
            offset_s,
            quality,
            meta: CorrelationMeta {
                window_s: 2.0,
                candidates_considered: 1,
                pending_depth: 0,
                dropped_count: 2,
                out_of_order_count: 1,
            },
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();

        stats.push(1.0);
        stats.push(2.0);
        stats.push(3.0);
        stats.push(4.0);
        stats.push(5.0);

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = CorrelationMetricsAggregator::new();

        aggregator.update(&make_record(
            1,
            Some(CorrelationQuality::Excellent),
            Some(0.2),
        ));
        aggregator.update(&make_record(2, Some(CorrelationQuality::NoImpact), None));
        aggregator.update(&make_record(3, None, None));

        assert_eq!(aggregator.total_records, 3);
        assert_eq!(aggregator.control_records, 1);
        assert_eq!(aggregator.no_impact, 1);
        assert_eq!(aggregator.quality_counts.get("excellent"), Some(&1));
        assert_eq!(aggregator.target_counts.get("A"), Some(&1));
        assert_eq!(aggregator.impacts_dropped, 2);
        assert_eq!(aggregator.offset_stats.count(), 1);
    }

    #[test]
    fn test_summary_pairing_rate() {
        let mut aggregator = CorrelationMetricsAggregator::new();

        aggregator.update(&make_record(
            1,
            Some(CorrelationQuality::Excellent),
            Some(0.2),
        ));
        aggregator.update(&make_record(2, Some(CorrelationQuality::NoImpact), None));

        let summary = aggregator.summary();
        assert_eq!(summary.shot_records, 2);
        assert_eq!(summary.paired_records, 1);
        assert!((summary.pairing_rate - 50.0).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = CorrelationMetricsAggregator::new();
        aggregator.update(&make_record(
            1,
            Some(CorrelationQuality::Excellent),
            Some(0.2),
        ));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Total records: 1"));
        assert!(output.contains("excellent: 1"));
        assert!(output.contains("Hits per target:"));
    }
}
