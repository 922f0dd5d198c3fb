//! Sink workers
//!
//! Each sink runs behind its own bounded queue on its own task, so a
//! slow or failing sink never stalls the record loop or its peers. The
//! worker drains the queue in batches and flushes the sink once per
//! batch.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use contracts::{CorrelatedRecord, RecordSink};

use crate::metrics::SinkMetrics;
use crate::route::RecordFilter;

/// Records drained per worker wakeup
const DRAIN_BATCH: usize = 32;

/// Outcome of offering a record to a sink queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued,
    /// The sink's filter does not want this record
    Filtered,
    /// Queue full, record dropped for this sink only
    Overflow,
    /// Worker is gone
    Closed,
}

/// A running sink: its queue, filter and worker task
pub struct SinkHandle {
    name: String,
    filter: RecordFilter,
    tx: mpsc::Sender<CorrelatedRecord>,
    metrics: Arc<SinkMetrics>,
    worker: JoinHandle<()>,
}

impl SinkHandle {
    /// Spawn the worker for `sink` and return its handle.
    pub fn start<S>(sink: S, filter: RecordFilter, queue_capacity: usize) -> Self
    where
        S: RecordSink + Send + 'static,
    {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity);
        let metrics = Arc::new(SinkMetrics::new());
        let worker = tokio::spawn(drain(sink, rx, Arc::clone(&metrics)));

        Self {
            name,
            filter,
            tx,
            metrics,
            worker,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Offer a record to this sink; clones only when the filter accepts.
    pub fn offer(&self, record: &CorrelatedRecord) -> Offer {
        if !self.filter.accepts(record) {
            self.metrics.note_filtered();
            return Offer::Filtered;
        }

        match self.tx.try_send(record.clone()) {
            Ok(()) => Offer::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.metrics.note_queue_full();
                warn!(
                    sink = %self.name,
                    record_id = record.record_id,
                    "sink queue full, record dropped"
                );
                Offer::Overflow
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "sink worker gone");
                Offer::Closed
            }
        }
    }

    /// Close the queue, then wait for the worker to drain and shut the
    /// sink down.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            error!(sink = %self.name, error = ?e, "sink worker panicked");
        }
    }
}

async fn drain<S: RecordSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<CorrelatedRecord>,
    metrics: Arc<SinkMetrics>,
) {
    let name = sink.name().to_string();
    debug!(sink = %name, "sink worker up");

    let mut batch = Vec::with_capacity(DRAIN_BATCH);
    while rx.recv_many(&mut batch, DRAIN_BATCH).await > 0 {
        metrics.note_queue_len(rx.len());

        for record in batch.drain(..) {
            match sink.record(&record).await {
                Ok(()) => metrics.note_written(&record),
                Err(e) => {
                    metrics.note_failed();
                    error!(
                        sink = %name,
                        record_id = record.record_id,
                        error = %e,
                        "sink write failed"
                    );
                }
            }
        }

        if let Err(e) = sink.flush().await {
            error!(sink = %name, error = %e, "sink flush failed");
        }
    }

    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "sink close failed");
    }
    debug!(sink = %name, written = metrics.written(), "sink worker done");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ContractError, CorrelationMeta, CorrelationQuality, TimerEvent, TimerEventKind,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::time::{sleep, Duration};

    fn make_record(record_id: u64, kind: TimerEventKind) -> CorrelatedRecord {
        let quality = match kind {
            TimerEventKind::Shot => Some(CorrelationQuality::NoImpact),
            _ => None,
        };
        CorrelatedRecord {
            record_id,
            timer: TimerEvent {
                kind,
                timestamp: 5.0,
                sequence: 1,
                split_s: 0.8,
                cumulative_s: 5.0,
                string_number: 1,
            },
            impact: None,
            offset_s: None,
            quality,
            meta: CorrelationMeta {
                window_s: 2.0,
                candidates_considered: 0,
                pending_depth: 0,
                dropped_count: 0,
                out_of_order_count: 0,
            },
        }
    }

    /// Mock sink for testing
    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn counted(name: &str) -> (Self, Arc<AtomicU64>) {
            let write_count = Arc::new(AtomicU64::new(0));
            let sink = Self {
                name: name.to_string(),
                write_count: Arc::clone(&write_count),
                should_fail: false,
                delay_ms: 0,
            };
            (sink, write_count)
        }
    }

    impl RecordSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn record(&mut self, _record: &CorrelatedRecord) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_drains_queue() {
        let (sink, write_count) = MockSink::counted("test");
        let handle = SinkHandle::start(sink, RecordFilter::default(), 10);

        for i in 0..5 {
            assert_eq!(
                handle.offer(&make_record(i, TimerEventKind::Shot)),
                Offer::Queued
            );
        }

        handle.close().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
    }

    #[tokio::test]
    async fn test_filter_short_circuits_before_queue() {
        let (sink, write_count) = MockSink::counted("shots");
        let handle = SinkHandle::start(sink, RecordFilter::shots_only(), 10);

        assert_eq!(
            handle.offer(&make_record(1, TimerEventKind::Start)),
            Offer::Filtered
        );
        assert_eq!(
            handle.offer(&make_record(2, TimerEventKind::Shot)),
            Offer::Queued
        );

        let metrics = Arc::clone(handle.metrics());
        handle.close().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.filtered(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_for_this_sink_only() {
        let sink = MockSink {
            name: "slow".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            should_fail: false,
            delay_ms: 100,
        };
        let handle = SinkHandle::start(sink, RecordFilter::default(), 2);

        let mut overflowed = 0;
        for i in 0..10 {
            if handle.offer(&make_record(i, TimerEventKind::Shot)) == Offer::Overflow {
                overflowed += 1;
            }
        }
        assert!(overflowed > 0);
        assert!(handle.metrics().queue_full() > 0);

        handle.close().await;
    }

    #[tokio::test]
    async fn test_write_failures_are_isolated() {
        let sink = MockSink {
            name: "failing".to_string(),
            write_count: Arc::new(AtomicU64::new(0)),
            should_fail: true,
            delay_ms: 0,
        };
        let handle = SinkHandle::start(sink, RecordFilter::default(), 10);

        for i in 0..3 {
            handle.offer(&make_record(i, TimerEventKind::Shot));
        }

        sleep(Duration::from_millis(50)).await;
        assert!(handle.metrics().failed() > 0);

        handle.close().await;
    }
}
