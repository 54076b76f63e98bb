//! Blink state machine
//!
//! ```text
//!            timer fire / tap
//!   Open ─────────────────────▶ Blinking { until }
//!    ▲                               │
//!    └────── now >= until ───────────┘
//!                 │ 20 %: chain another blink 200 ms later
//! ```
//!
//! Timers are plain deadlines in milliseconds, polled from the animation
//! tick. Cancelling a timer means clearing its deadline.

use rand::Rng;
use tracing::trace;

/// Range of the repeating blink interval, drawn once per blinker
pub const BLINK_INTERVAL_MS: (f64, f64) = (2000.0, 5000.0);
/// Range of a single blink's duration
pub const BLINK_DURATION_MS: (f64, f64) = (80.0, 200.0);
/// Chance that a timed blink is followed by a second one
pub const DOUBLE_BLINK_CHANCE: f64 = 0.2;
/// Gap before the chained blink
pub const DOUBLE_BLINK_DELAY_MS: f64 = 200.0;
/// Length of the blink forced by a tap
pub const TAP_BLINK_MS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BlinkState {
    Open,
    Blinking {
        /// When the eyes reopen
        until: f64,
        /// Whether reopening may chain a second blink (timed blinks only)
        may_chain: bool,
    },
}

impl BlinkState {
    pub fn is_blinking(&self) -> bool {
        matches!(self, BlinkState::Blinking { .. })
    }
}

/// Drives the eyelids from an interval timer, a chain timer and taps
#[derive(Debug, Clone)]
pub struct Blinker {
    state: BlinkState,
    interval_ms: f64,
    next_blink_at: Option<f64>,
    chained_blink_at: Option<f64>,
    enabled: bool,
}

impl Blinker {
    /// Create a blinker with a random interval; the first blink is one
    /// interval after the first update
    pub fn new<R: Rng + ?Sized>(rng: &mut R, enabled: bool) -> Self {
        let interval_ms = rng.gen_range(BLINK_INTERVAL_MS.0..BLINK_INTERVAL_MS.1);
        Self::with_interval(interval_ms, enabled)
    }

    pub fn with_interval(interval_ms: f64, enabled: bool) -> Self {
        Self {
            state: BlinkState::Open,
            interval_ms,
            next_blink_at: None,
            chained_blink_at: None,
            enabled,
        }
    }

    pub fn state(&self) -> BlinkState {
        self.state
    }

    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    pub fn next_blink_at(&self) -> Option<f64> {
        self.next_blink_at
    }

    pub fn chained_blink_at(&self) -> Option<f64> {
        self.chained_blink_at
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        usize::from(self.next_blink_at.is_some()) + usize::from(self.chained_blink_at.is_some())
    }

    /// Advance to `now` and report whether the eyes are closed
    pub fn update<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) -> bool {
        if !self.enabled {
            return false;
        }

        if let BlinkState::Blinking { until, may_chain } = self.state {
            if now >= until {
                self.state = BlinkState::Open;
                if may_chain && rng.gen_bool(DOUBLE_BLINK_CHANCE) {
                    self.chained_blink_at = Some(until + DOUBLE_BLINK_DELAY_MS);
                }
            }
        }

        if let Some(at) = self.chained_blink_at {
            if now >= at {
                self.chained_blink_at = None;
                trace!("double blink");
                self.begin(now, rng);
            }
        }

        match self.next_blink_at {
            None => self.next_blink_at = Some(now + self.interval_ms),
            Some(at) if now >= at => {
                // Skip missed fires after a stall instead of blinking repeatedly
                let missed = ((now - at) / self.interval_ms).floor() + 1.0;
                self.next_blink_at = Some(at + missed * self.interval_ms);
                self.begin(now, rng);
            }
            Some(_) => {}
        }

        self.state.is_blinking()
    }

    fn begin<R: Rng + ?Sized>(&mut self, now: f64, rng: &mut R) {
        let duration = rng.gen_range(BLINK_DURATION_MS.0..BLINK_DURATION_MS.1);
        let until = match self.state {
            BlinkState::Blinking { until, .. } => until.max(now + duration),
            BlinkState::Open => now + duration,
        };
        self.state = BlinkState::Blinking {
            until,
            may_chain: true,
        };
    }

    /// Close the eyes right now for `duration_ms`
    pub fn force(&mut self, now: f64, duration_ms: f64) {
        if !self.enabled {
            return;
        }
        self.state = BlinkState::Blinking {
            until: now + duration_ms,
            may_chain: false,
        };
    }

    /// Disarm every timer and open the eyes; later updates do nothing
    pub fn cancel(&mut self) {
        self.enabled = false;
        self.state = BlinkState::Open;
        self.next_blink_at = None;
        self.chained_blink_at = None;
    }
}
