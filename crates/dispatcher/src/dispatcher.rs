//! Record fan-out loop

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use contracts::{CorrelatedRecord, SinkConfig, SinkType};

use crate::error::DispatcherError;
use crate::handle::{Offer, SinkHandle};
use crate::metrics::SinkReport;
use crate::route::RecordFilter;
use crate::sinks::{FileSink, LogSink, NetworkSink};

/// Fans correlated records out to every configured sink.
///
/// Each sink decides through its [`RecordFilter`] which records it
/// receives; the dispatcher itself never blocks on a sink.
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<CorrelatedRecord>,
}

/// Build a dispatcher from sink configurations.
pub async fn create_dispatcher(
    sink_configs: Vec<SinkConfig>,
    input_rx: mpsc::Receiver<CorrelatedRecord>,
) -> Result<Dispatcher, DispatcherError> {
    let mut handles = Vec::with_capacity(sink_configs.len());
    for config in &sink_configs {
        handles.push(open_sink(config).await?);
    }
    Ok(Dispatcher { handles, input_rx })
}

async fn open_sink(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let filter = RecordFilter::from_params(&config.params)
        .map_err(|e| DispatcherError::sink_creation(&config.name, e))?;

    let handle = match config.sink_type {
        SinkType::Log => {
            SinkHandle::start(LogSink::new(&config.name), filter, config.queue_capacity)
        }
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::start(sink, filter, config.queue_capacity)
        }
        SinkType::Network => {
            let sink = NetworkSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::start(sink, filter, config.queue_capacity)
        }
    };

    debug!(sink = %config.name, sink_type = ?config.sink_type, "sink opened");
    Ok(handle)
}

impl Dispatcher {
    /// Assemble from already-running handles.
    pub fn from_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<CorrelatedRecord>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Per-sink delivery reports.
    pub fn metrics(&self) -> Vec<(String, SinkReport)> {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().report()))
            .collect()
    }

    /// Consume records until the input closes, then drain every sink.
    pub async fn run(mut self) {
        info!(sinks = self.handles.len(), "dispatcher started");

        let mut shots: u64 = 0;
        let mut controls: u64 = 0;

        while let Some(record) = self.input_rx.recv().await {
            if record.quality.is_some() {
                shots += 1;
            } else {
                controls += 1;
            }

            for handle in &self.handles {
                if handle.offer(&record) == Offer::Closed {
                    warn!(
                        sink = %handle.name(),
                        record_id = record.record_id,
                        "record lost to dead sink"
                    );
                }
            }
        }

        info!(shots, controls, "record stream closed, draining sinks");

        for handle in self.handles {
            let name = handle.name().to_string();
            handle.close().await;
            debug!(sink = %name, "sink drained");
        }

        info!("dispatcher shutdown complete");
    }

    /// Run on a background task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
