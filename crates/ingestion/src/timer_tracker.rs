//! Timer protocol state machine.
//!
//! Tracks string lifecycle across decoded timer frames: `Idle` until a
//! START arms a string, `Running` while shots come in, `Stopped` after
//! the review frame. The tracker assigns its own 1-based shot sequence
//! per string (reset on every START) instead of trusting the wire
//! `shot_count`, which some timers repeat on retransmits.
//!
//! Frames that make no sense in the current state (a SHOT with no armed
//! string) are dropped at debug level; a flaky timer must not kill the
//! session.

use contracts::{DeviceId, TimerEvent, TimerEventKind, TimerFrame};
use tracing::{debug, trace};

/// Timer protocol tracker, one per timer device.
pub struct TimerTracker {
    device: DeviceId,
    state: TimerState,
    dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerState {
    Idle,
    Armed { string_number: u32 },
    Running { string_number: u32, shots: u32 },
    Stopped,
}

impl TimerTracker {
    /// Create a tracker for one timer device.
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            state: TimerState::Idle,
            dropped: 0,
        }
    }

    /// Frames dropped as out-of-protocol.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    /// Push one decoded frame; returns the event it produces, if any.
    pub fn push(&mut self, timestamp: f64, frame: &TimerFrame) -> Option<TimerEvent> {
        match frame.kind {
            TimerEventKind::Start => Some(self.on_start(timestamp, frame)),
            TimerEventKind::Shot => self.on_shot(timestamp, frame),
            TimerEventKind::Stop => self.on_stop(timestamp, frame),
        }
    }

    fn on_start(&mut self, timestamp: f64, frame: &TimerFrame) -> TimerEvent {
        let string_number = frame.string_number as u32;
        trace!(device = %self.device, string_number, "string armed");
        self.state = TimerState::Armed { string_number };

        TimerEvent {
            kind: TimerEventKind::Start,
            timestamp,
            sequence: 0,
            split_s: 0.0,
            cumulative_s: 0.0,
            string_number,
        }
    }

    fn on_shot(&mut self, timestamp: f64, frame: &TimerFrame) -> Option<TimerEvent> {
        let (string_number, shots) = match self.state {
            TimerState::Armed { string_number } => (string_number, 1),
            TimerState::Running {
                string_number,
                shots,
            } => (string_number, shots + 1),
            TimerState::Idle | TimerState::Stopped => {
                self.dropped += 1;
                debug!(device = %self.device, "shot frame outside an armed string, dropped");
                return None;
            }
        };

        self.state = TimerState::Running {
            string_number,
            shots,
        };

        Some(TimerEvent {
            kind: TimerEventKind::Shot,
            timestamp,
            sequence: shots,
            split_s: frame.split_s,
            cumulative_s: frame.cumulative_s,
            string_number,
        })
    }

    fn on_stop(&mut self, timestamp: f64, frame: &TimerFrame) -> Option<TimerEvent> {
        let (string_number, shots) = match self.state {
            TimerState::Armed { string_number } => (string_number, 0),
            TimerState::Running {
                string_number,
                shots,
            } => (string_number, shots),
            TimerState::Idle | TimerState::Stopped => {
                self.dropped += 1;
                debug!(device = %self.device, "stop frame with no active string, dropped");
                return None;
            }
        };

        trace!(device = %self.device, string_number, shots, "string stopped");
        self.state = TimerState::Stopped;

        Some(TimerEvent {
            kind: TimerEventKind::Stop,
            timestamp,
            sequence: shots,
            split_s: frame.split_s,
            cumulative_s: frame.cumulative_s,
            string_number,
        })
    }
}
