use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};
use tracing::{debug, warn};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum TimerEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait TimerEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError>;
}

/// Production event source reading crossterm events on a helper thread
pub struct CrosstermEventSource {
    rx: Receiver<TimerEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => Some(TimerEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => Some(TimerEvent::Resize),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "terminal event stream closed");
                    break;
                }
            };
            if let Some(ev) = forwarded {
                if tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Channel-fed event source for headless runs and tests
pub struct TestEventSource {
    rx: Receiver<TimerEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<TimerEvent>) -> Self {
        Self { rx }
    }
}

impl TimerEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<TimerEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: TimerEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: TimerEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> TimerEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => TimerEvent::Tick,
        }
    }
}

/// Edge of the trigger key as the hold gesture needs it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEdge {
    Press(i64),
    Release(i64),
}

/// Recovers key releases from terminals that only report presses.
///
/// Holding a key produces a press, a pause of the OS repeat delay, then a
/// stream of repeated presses. The key counts as released once that stream
/// has been quiet for longer than the expected gap; the release is dated at
/// the last event seen, which is the closest known instant to the real one.
#[derive(Clone, Debug)]
pub struct ReleaseInference {
    initial_gap_ms: i64,
    repeat_gap_ms: i64,
    down: Option<HeldKey>,
}

#[derive(Clone, Copy, Debug)]
struct HeldKey {
    last_seen: i64,
    repeats: u32,
}

impl ReleaseInference {
    pub fn new(initial_gap_ms: u64, repeat_gap_ms: u64) -> Self {
        Self {
            initial_gap_ms: initial_gap_ms as i64,
            repeat_gap_ms: repeat_gap_ms as i64,
            down: None,
        }
    }

    pub fn is_down(&self) -> bool {
        self.down.is_some()
    }

    pub fn on_press(&mut self, now: i64) -> Option<TriggerEdge> {
        match self.down.as_mut() {
            Some(held) => {
                held.last_seen = now;
                held.repeats += 1;
                None
            }
            None => {
                self.down = Some(HeldKey {
                    last_seen: now,
                    repeats: 0,
                });
                Some(TriggerEdge::Press(now))
            }
        }
    }

    pub fn on_tick(&mut self, now: i64) -> Option<TriggerEdge> {
        let held = self.down?;
        let gap = if held.repeats == 0 {
            self.initial_gap_ms
        } else {
            self.repeat_gap_ms
        };
        if now - held.last_seen > gap {
            self.down = None;
            debug!(repeats = held.repeats, at = held.last_seen, "release inferred");
            return Some(TriggerEdge::Release(held.last_seen));
        }
        None
    }
}

/// How trigger key events turn into press/release edges
#[derive(Clone, Debug)]
pub enum TriggerInput {
    /// The terminal reports press, repeat and release kinds
    Native,
    Inferred(ReleaseInference),
}

impl TriggerInput {
    pub fn on_key(&mut self, kind: KeyEventKind, now: i64) -> Option<TriggerEdge> {
        match self {
            TriggerInput::Native => match kind {
                KeyEventKind::Press => Some(TriggerEdge::Press(now)),
                KeyEventKind::Release => Some(TriggerEdge::Release(now)),
                KeyEventKind::Repeat => None,
            },
            TriggerInput::Inferred(inference) => match kind {
                KeyEventKind::Release => None,
                _ => inference.on_press(now),
            },
        }
    }

    pub fn on_tick(&mut self, now: i64) -> Option<TriggerEdge> {
        match self {
            TriggerInput::Native => None,
            TriggerInput::Inferred(inference) => inference.on_tick(now),
        }
    }

    /// Forget a key that is still considered down
    pub fn reset(&mut self) {
        if let TriggerInput::Inferred(inference) = self {
            inference.down = None;
        }
    }
}
