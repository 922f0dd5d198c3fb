//! Adapter common utility functions

use std::sync::Arc;

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{DropPolicy, RangeEvent};
use tracing::trace;

use crate::config::IngestionMetrics;

/// Send event, handling backpressure policy
///
/// `overflow_rx` is a receiver clone on the same channel; under
/// `DropOldest` it pops the head of the shared queue to make room for
/// the incoming event.
#[inline]
pub fn send_event(
    tx: &Sender<RangeEvent>,
    overflow_rx: &Receiver<RangeEvent>,
    event: RangeEvent,
    metrics: &Arc<IngestionMetrics>,
    device: &str,
    drop_policy: DropPolicy,
) {
    match tx.try_send(event) {
        Ok(_) => {
            metrics.record_emitted();
            trace!(device = %device, "event sent");
        }
        Err(TrySendError::Full(event)) => {
            metrics.record_dropped();
            match drop_policy {
                DropPolicy::DropNewest => {
                    trace!(device = %device, "event dropped (newest)");
                }
                DropPolicy::DropOldest => {
                    let _ = overflow_rx.try_recv();
                    trace!(device = %device, "event dropped (oldest)");
                    if tx.try_send(event).is_ok() {
                        metrics.record_emitted();
                    }
                }
            }
        }
        Err(TrySendError::Closed(_)) => {
            tracing::warn!(device = %device, "event channel closed");
        }
    }
}
