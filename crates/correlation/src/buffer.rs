//! Impact candidate buffer with timestamp-based window queries.
//!
//! Uses index-based separation:
//! - HeapRb stores lightweight metadata (peak timestamp + slab key)
//! - Slab stores the actual ImpactEvent data
//!
//! This keeps window scans over the small metadata ring while event
//! payloads stay put until consumed.

use std::cmp::Ordering;
use std::fmt;

use contracts::ImpactEvent;
use ringbuf::{traits::*, HeapRb};
use slab::Slab;

/// Lightweight metadata stored in the ring buffer
#[derive(Debug, Clone, Copy)]
struct ImpactMeta {
    /// Peak timestamp for ordering and window queries
    timestamp: f64,
    /// Key into the slab storage
    slab_key: usize,
}

/// Impact candidate buffer with capacity and expiry eviction
///
/// A candidate is consumed (removed) the moment a SHOT claims it, so one
/// impact can never pair with two shots.
pub struct ImpactBuffer {
    /// Ring buffer of metadata (timestamp + slab key)
    index: HeapRb<ImpactMeta>,
    /// Actual event storage
    storage: Slab<ImpactEvent>,
    max_size: usize,
    dropped_count: u64,
    out_of_order_count: u64,
    last_timestamp: Option<f64>,
}

impl fmt::Debug for ImpactBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImpactBuffer")
            .field("len", &self.index.occupied_len())
            .field("max_size", &self.max_size)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl ImpactBuffer {
    /// Create a new impact buffer
    #[inline]
    pub fn new(max_size: usize) -> Self {
        Self {
            index: HeapRb::new(max_size),
            storage: Slab::with_capacity(max_size),
            max_size,
            dropped_count: 0,
            out_of_order_count: 0,
            last_timestamp: None,
        }
    }

    /// Push an impact into the buffer
    ///
    /// If the buffer is full, the oldest-inserted candidate is dropped.
    #[inline]
    pub fn push(&mut self, event: ImpactEvent) {
        let timestamp = event.peak_ts;

        // Track out-of-order arrivals
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_timestamp = Some(timestamp);

        // If full, remove oldest entry from both index and storage
        if self.index.is_full() {
            if let Some(old_meta) = self.index.try_pop() {
                self.storage.remove(old_meta.slab_key);
            }
            self.dropped_count += 1;
        }

        let slab_key = self.storage.insert(event);
        let meta = ImpactMeta {
            timestamp,
            slab_key,
        };
        let _ = self.index.try_push(meta);
    }

    /// Count candidates inside `target +/- half_window`.
    #[inline]
    pub fn count_in_window(&self, target: f64, half_window: f64) -> usize {
        self.index
            .iter()
            .filter(|m| (m.timestamp - target).abs() <= half_window)
            .count()
    }

    /// Take the best candidate inside `target +/- half_window`.
    ///
    /// Best means smallest |timestamp - target|; on an exact tie the
    /// earlier impact wins. The chosen candidate is removed from the
    /// buffer (consumed).
    #[inline]
    pub fn take_best_in_window(&mut self, target: f64, half_window: f64) -> Option<ImpactEvent> {
        let best = self
            .index
            .iter()
            .filter(|m| (m.timestamp - target).abs() <= half_window)
            .min_by(|a, b| {
                let da = (a.timestamp - target).abs();
                let db = (b.timestamp - target).abs();
                da.partial_cmp(&db)
                    .unwrap_or(Ordering::Equal)
                    // tie: earlier impact wins
                    .then_with(|| {
                        a.timestamp
                            .partial_cmp(&b.timestamp)
                            .unwrap_or(Ordering::Equal)
                    })
            })?;
        let key = best.slab_key;

        // Rebuild the index without the consumed entry (metadata only)
        let remaining: Vec<ImpactMeta> = self
            .index
            .pop_iter()
            .filter(|m| m.slab_key != key)
            .collect();
        for m in remaining {
            let _ = self.index.try_push(m);
        }

        Some(self.storage.remove(key))
    }

    /// Evict candidates with a peak timestamp before `cutoff`.
    #[inline]
    pub fn evict_expired(&mut self, cutoff: f64) -> usize {
        let mut evicted = 0;

        let remaining: Vec<ImpactMeta> = self
            .index
            .pop_iter()
            .filter(|m| {
                if m.timestamp >= cutoff {
                    true
                } else {
                    self.storage.remove(m.slab_key);
                    evicted += 1;
                    false
                }
            })
            .collect();

        for m in remaining {
            let _ = self.index.try_push(m);
        }

        self.dropped_count += evicted as u64;
        evicted
    }

    /// Get the number of buffered candidates
    #[inline]
    pub fn len(&self) -> usize {
        self.index.occupied_len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get dropped candidate count (overflow + expiry)
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Get out-of-order arrival count
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}
