//! # Correlation Engine
//!
//! Pairs shot-timer SHOT events with confirmed sensor impacts on the
//! shared session clock.
//!
//! Responsibilities:
//! - Buffer impact candidates and consume each at most once
//! - Hold every SHOT open for the full window before pairing
//! - Classify offsets into quality tiers
//! - Emit `CorrelatedRecord`s with diagnostic metadata
//!
//! ## Usage Example
//!
//! ```ignore
//! use correlation::CorrelationEngine;
//! use contracts::CorrelationConfig;
//!
//! let mut engine = CorrelationEngine::new(CorrelationConfig::default());
//!
//! // Push events as they arrive
//! for record in engine.push(event) {
//!     // dispatch the record
//! }
//!
//! // Drive finalization from a periodic tick
//! for record in engine.advance(now) {
//!     // dispatch the record
//! }
//! ```

mod buffer;
mod engine;
mod quality;

// Re-exports
pub use buffer::ImpactBuffer;
pub use engine::CorrelationEngine;
pub use quality::classify;

pub use contracts::{CorrelatedRecord, CorrelationConfig, CorrelationMeta, CorrelationQuality};
