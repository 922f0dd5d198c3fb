//! Quality tier classification for shot/impact offsets.

use contracts::{CorrelationConfig, CorrelationQuality};

/// Classify an absolute shot-to-impact offset into a quality tier.
///
/// Boundaries are inclusive: an offset exactly on a cutoff lands in the
/// better tier.
#[inline]
pub fn classify(offset_abs: f64, config: &CorrelationConfig) -> CorrelationQuality {
    if offset_abs <= config.excellent_s {
        CorrelationQuality::Excellent
    } else if offset_abs <= config.good_s {
        CorrelationQuality::Good
    } else if offset_abs <= config.window_s {
        CorrelationQuality::Fair
    } else {
        CorrelationQuality::NoImpact
    }
}
