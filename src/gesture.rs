//! Hold-to-start / press-to-stop interpretation of a single trigger key.
//!
//! The machine is fed timestamps in milliseconds and never reads a clock
//! itself, so every transition can be driven deterministically.

use tracing::debug;

/// Hold fraction at which the readout starts signalling a charge
pub const CHARGING_FRACTION: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    Holding { since: i64 },
    Running { started_at: i64 },
}

/// What a single press or release did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// Event had no effect (repeat, stray release, press while key down)
    Ignored,
    /// Hold began
    Armed,
    /// Released too early; nothing starts
    Cancelled,
    /// Clock started at this instant
    Started { at: i64 },
    /// Clock stopped; authoritative elapsed time, never negative
    Stopped { elapsed_ms: i64 },
}

/// Readout feedback derived from state and hold progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Neutral,
    Charging,
    Ready,
}

#[derive(Debug, Clone)]
pub struct HoldGesture {
    hold_duration_ms: i64,
    state: GestureState,
    key_down: bool,
}

impl HoldGesture {
    pub fn new(hold_duration_ms: u64) -> Self {
        Self {
            hold_duration_ms: hold_duration_ms as i64,
            state: GestureState::Idle,
            key_down: false,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn hold_duration_ms(&self) -> u64 {
        self.hold_duration_ms as u64
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, GestureState::Running { .. })
    }

    pub fn is_holding(&self) -> bool {
        matches!(self.state, GestureState::Holding { .. })
    }

    pub fn press(&mut self, now: i64) -> GestureOutcome {
        if self.key_down {
            return GestureOutcome::Ignored;
        }
        self.key_down = true;

        match self.state {
            GestureState::Idle => {
                self.state = GestureState::Holding { since: now };
                debug!(at = now, "hold armed");
                GestureOutcome::Armed
            }
            GestureState::Running { started_at } => {
                let elapsed_ms = (now - started_at).max(0);
                self.state = GestureState::Idle;
                debug!(elapsed_ms, "timer stopped");
                GestureOutcome::Stopped { elapsed_ms }
            }
            // key_down is always set while holding
            GestureState::Holding { .. } => GestureOutcome::Ignored,
        }
    }

    pub fn release(&mut self, now: i64) -> GestureOutcome {
        if !self.key_down {
            return GestureOutcome::Ignored;
        }
        self.key_down = false;

        match self.state {
            GestureState::Holding { since } => {
                if now - since >= self.hold_duration_ms {
                    self.state = GestureState::Running { started_at: now };
                    debug!(at = now, held_ms = now - since, "timer started");
                    GestureOutcome::Started { at: now }
                } else {
                    self.state = GestureState::Idle;
                    debug!(held_ms = now - since, "hold cancelled");
                    GestureOutcome::Cancelled
                }
            }
            // the release that follows a stopping press
            GestureState::Idle | GestureState::Running { .. } => GestureOutcome::Ignored,
        }
    }

    /// Drop any hold or run in progress without producing a solve
    pub fn abort(&mut self) {
        self.state = GestureState::Idle;
        self.key_down = false;
    }

    /// Live elapsed time for the readout; only the stop press is authoritative
    pub fn elapsed(&self, now: i64) -> Option<i64> {
        match self.state {
            GestureState::Running { started_at } => Some((now - started_at).max(0)),
            _ => None,
        }
    }

    /// Hold progress in `[0, 1]`, `None` unless holding
    pub fn hold_fraction(&self, now: i64) -> Option<f64> {
        match self.state {
            GestureState::Holding { since } => {
                if self.hold_duration_ms <= 0 {
                    return Some(1.0);
                }
                let held = (now - since).max(0) as f64;
                Some((held / self.hold_duration_ms as f64).min(1.0))
            }
            _ => None,
        }
    }

    pub fn signal(&self, now: i64) -> Signal {
        match self.hold_fraction(now) {
            Some(f) if f >= 1.0 => Signal::Ready,
            Some(f) if f >= CHARGING_FRACTION => Signal::Charging,
            _ => Signal::Neutral,
        }
    }
}
