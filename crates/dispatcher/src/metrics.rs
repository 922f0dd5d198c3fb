//! Per-sink delivery accounting
//!
//! Counters are split by outcome on the dispatch side (filtered,
//! queue-full) and by record class on the write side (hits, misses,
//! controls), so a sink report reads like a range summary rather than a
//! raw queue log.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use contracts::CorrelatedRecord;

/// Outcome counters for one sink
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    failed: AtomicU64,
    queue_full: AtomicU64,
    filtered: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn note_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Record a successful write, classifying shot records by outcome.
    pub(crate) fn note_written(&self, record: &CorrelatedRecord) {
        self.written.fetch_add(1, Ordering::Relaxed);
        if record.quality.is_some() {
            if record.impact.is_some() {
                self.hits.fetch_add(1, Ordering::Relaxed);
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub(crate) fn note_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_queue_full(&self) {
        self.queue_full.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn queue_full(&self) -> u64 {
        self.queue_full.load(Ordering::Relaxed)
    }

    pub fn filtered(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    /// Point-in-time copy for reporting
    pub fn report(&self) -> SinkReport {
        SinkReport {
            queue_len: self.queue_len.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            queue_full: self.queue_full.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
        }
    }
}

/// Copyable snapshot of one sink's counters
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkReport {
    pub queue_len: usize,
    pub written: u64,
    pub hits: u64,
    pub misses: u64,
    pub failed: u64,
    pub queue_full: u64,
    pub filtered: u64,
}

impl SinkReport {
    /// Control records (START/STOP) among the writes
    pub fn controls(&self) -> u64 {
        self.written - self.hits - self.misses
    }
}
