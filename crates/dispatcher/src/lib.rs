//! # Dispatcher
//!
//! Record fan-out module.
//!
//! Responsibilities:
//! - Consume `CorrelatedRecord`s from the correlation engine
//! - Fan out to multiple sinks (log, file, network)
//! - Route per-sink record slices (shots only, hits only, one target)
//! - Isolate slow sinks so they never block the main path

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod route;
pub mod sinks;

pub use contracts::{CorrelatedRecord, RecordSink};
pub use dispatcher::{create_dispatcher, Dispatcher};
pub use error::DispatcherError;
pub use handle::{Offer, SinkHandle};
pub use metrics::{SinkMetrics, SinkReport};
pub use route::RecordFilter;
pub use sinks::{FileSink, LogSink, NetworkSink, WireEncoding};
