//! Correlation engine pairing shot-timer SHOTs with sensor impacts.
//!
//! The engine is driven two ways:
//! - `push` feeds it range events as they arrive off the merged stream
//! - `advance` moves its clock forward so pending SHOTs whose window has
//!   fully elapsed can be finalized even when no more events arrive
//!
//! A SHOT is held open for the full window duration before pairing, so a
//! closer impact arriving late still wins over an earlier, farther one.

use std::collections::VecDeque;

use contracts::{
    CorrelatedRecord, CorrelationConfig, CorrelationMeta, CorrelationQuality, RangeEvent,
    TimerEvent, TimerEventKind,
};
use tracing::{debug, instrument, trace};

use crate::buffer::ImpactBuffer;
use crate::quality::classify;

/// A SHOT waiting for its correlation window to elapse.
#[derive(Debug, Clone)]
struct PendingShot {
    timer: TimerEvent,
}

/// Correlation engine
///
/// Single-owner, synchronous core. The orchestrator owns one instance and
/// calls it from the event-loop task, so no interior locking is needed.
#[derive(Debug)]
pub struct CorrelationEngine {
    config: CorrelationConfig,

    /// Buffered impact candidates, consumed as SHOTs claim them
    impacts: ImpactBuffer,

    /// SHOTs whose window has not elapsed yet, in arrival order
    pending: VecDeque<PendingShot>,

    /// Monotonic record id, starts at 1
    next_record_id: u64,

    /// Latest observed time (event timestamps and advance ticks)
    now: f64,
}

impl CorrelationEngine {
    /// Create a new engine with the given correlation policy.
    pub fn new(config: CorrelationConfig) -> Self {
        Self {
            impacts: ImpactBuffer::new(config.buffer_size),
            config,
            pending: VecDeque::new(),
            next_record_id: 1,
            now: f64::NEG_INFINITY,
        }
    }

    /// Feed one range event into the engine.
    ///
    /// START and STOP events bypass pairing and produce a record
    /// immediately. SHOT events are held until their window elapses.
    /// Impact events are buffered as candidates. Status events are
    /// handled upstream and ignored here.
    #[instrument(name = "correlation_push", skip(self, event), fields(kind = event.kind_str()))]
    pub fn push(&mut self, event: RangeEvent) -> Vec<CorrelatedRecord> {
        let timestamp = event.timestamp();
        let mut records = Vec::new();

        match event {
            RangeEvent::Timer(timer) => match timer.kind {
                TimerEventKind::Start | TimerEventKind::Stop => {
                    // control events carry no quality judgement
                    records.push(self.bypass_record(timer));
                }
                TimerEventKind::Shot => {
                    trace!(ts = timer.timestamp, seq = timer.sequence, "shot pending");
                    self.pending.push_back(PendingShot { timer });
                }
            },
            RangeEvent::Impact(impact) => {
                trace!(sensor = %impact.sensor, peak = impact.peak_ts, "impact buffered");
                self.impacts.push(impact);
            }
            RangeEvent::Status(_) => return records,
        }

        self.observe(timestamp);
        records.extend(self.finalize_ready());
        records
    }

    /// Advance the engine clock.
    ///
    /// Finalizes every pending SHOT whose window has fully elapsed and
    /// evicts impact candidates no pending or future SHOT can reach.
    #[instrument(name = "correlation_advance", skip(self))]
    pub fn advance(&mut self, now: f64) -> Vec<CorrelatedRecord> {
        self.observe(now);
        self.finalize_ready()
    }

    /// Number of SHOTs still waiting on their window.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of buffered impact candidates.
    pub fn buffered_impacts(&self) -> usize {
        self.impacts.len()
    }

    fn observe(&mut self, timestamp: f64) {
        if timestamp > self.now {
            self.now = timestamp;
        }
    }

    fn finalize_ready(&mut self) -> Vec<CorrelatedRecord> {
        let mut records = Vec::new();

        while let Some(front) = self.pending.front() {
            if self.now < front.timer.timestamp + self.config.window_s {
                break;
            }
            if let Some(shot) = self.pending.pop_front() {
                records.push(self.finalize_shot(shot.timer));
            }
        }

        // Impacts older than any reachable window are dead weight. A
        // SHOT may itself arrive out of order by up to a window, so an
        // empty pending queue still has to keep a second window of
        // candidates behind the clock.
        let late_shot_cutoff = self.now - 2.0 * self.config.window_s;
        let cutoff = match self.pending.front() {
            Some(front) => (front.timer.timestamp - self.config.window_s).min(late_shot_cutoff),
            None => late_shot_cutoff,
        };
        if cutoff.is_finite() {
            self.impacts.evict_expired(cutoff);
        }

        records
    }

    fn finalize_shot(&mut self, timer: TimerEvent) -> CorrelatedRecord {
        let shot_ts = timer.timestamp;
        let candidates = self.impacts.count_in_window(shot_ts, self.config.window_s);
        let impact = self
            .impacts
            .take_best_in_window(shot_ts, self.config.window_s);

        let (offset_s, quality) = match &impact {
            Some(event) => {
                let offset = event.peak_ts - shot_ts;
                (Some(offset), classify(offset.abs(), &self.config))
            }
            None => (None, CorrelationQuality::NoImpact),
        };

        metrics::counter!("correlation_records_total", "quality" => quality.as_str()).increment(1);
        debug!(
            seq = timer.sequence,
            offset = ?offset_s,
            quality = quality.as_str(),
            candidates,
            "shot finalized"
        );

        CorrelatedRecord {
            record_id: self.take_record_id(),
            timer,
            impact,
            offset_s,
            quality: Some(quality),
            meta: self.meta(candidates),
        }
    }

    fn bypass_record(&mut self, timer: TimerEvent) -> CorrelatedRecord {
        metrics::counter!("correlation_control_records_total").increment(1);
        CorrelatedRecord {
            record_id: self.take_record_id(),
            timer,
            impact: None,
            offset_s: None,
            quality: None,
            meta: self.meta(0),
        }
    }

    fn meta(&self, candidates: usize) -> CorrelationMeta {
        CorrelationMeta {
            window_s: self.config.window_s,
            candidates_considered: candidates as u32,
            pending_depth: self.pending.len() as u32,
            dropped_count: self.impacts.dropped_count() as u32,
            out_of_order_count: self.impacts.out_of_order_count() as u32,
        }
    }

    fn take_record_id(&mut self) -> u64 {
        let id = self.next_record_id;
        self.next_record_id += 1;
        id
    }
}
