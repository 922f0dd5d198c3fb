//! RecordSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for Sinks.

use crate::{CorrelatedRecord, ContractError};

/// Record output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one correlated record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn record(&mut self, record: &CorrelatedRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
