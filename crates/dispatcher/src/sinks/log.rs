//! LogSink - logs record summaries via tracing

use contracts::{ContractError, CorrelatedRecord, RecordSink};
use tracing::{info, instrument};

/// Sink that logs correlated record summaries for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_record_summary(&self, record: &CorrelatedRecord) {
        let quality = record
            .quality
            .map(|q| q.as_str())
            .unwrap_or("control");
        let target = record
            .impact
            .as_ref()
            .map(|i| i.target.as_str())
            .unwrap_or("-");

        info!(
            sink = %self.name,
            record_id = record.record_id,
            kind = record.timer.kind.as_str(),
            seq = record.timer.sequence,
            ts = record.timer.timestamp,
            quality,
            target,
            offset_s = ?record.offset_s,
            "CorrelatedRecord received"
        );
    }
}

impl RecordSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, record_id = record.record_id)
    )]
    async fn record(&mut self, record: &CorrelatedRecord) -> Result<(), ContractError> {
        self.log_record_summary(record);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
