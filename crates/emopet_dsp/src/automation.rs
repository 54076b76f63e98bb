//! Parameter Automation
//!
//! A small timeline of scheduled value changes, evaluated per sample.
//! Semantics follow the familiar audio-parameter model:
//!
//! - `set_value_at`: jump to a value at a time
//! - `linear_ramp_to`: ramp linearly from the previous event to a value
//! - `exponential_ramp_to`: ramp geometrically (falls back to linear when
//!   either endpoint is not strictly positive)
//! - `set_target_at`: exponential approach towards a target with a time constant
//!
//! A ramp scheduled after a `set_target_at` replaces the target curve: it
//! runs from the target's start time and the value held just before it.
//! Callers that want to ramp from the middle of a target curve freeze it
//! first with [`Automation::cancel_and_hold_at`].
//!
//! Events are kept sorted by time. Evaluation is O(events), and voices carry
//! at most a handful of events, so this is cheap enough for the audio path.

/// Smallest value used when fading to "silence" (exponential curves can't reach 0)
pub const SILENCE: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
enum EventKind {
    SetValue,
    LinearRamp,
    ExponentialRamp,
    SetTarget { time_constant: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Event {
    time: f64,
    value: f32,
    kind: EventKind,
}

/// What the parameter is doing after the last applied event
#[derive(Debug, Clone, Copy)]
enum Segment {
    Hold { time: f64, value: f32 },
    Target { start: f64, from: f32, target: f32, time_constant: f64 },
}

impl Segment {
    fn value_at(self, t: f64) -> f32 {
        match self {
            Segment::Hold { value, .. } => value,
            Segment::Target {
                start,
                from,
                target,
                time_constant,
            } => {
                if t <= start || time_constant <= 0.0 {
                    return if time_constant <= 0.0 { target } else { from };
                }
                let decay = (-(t - start) / time_constant).exp() as f32;
                target + (from - target) * decay
            }
        }
    }

    /// Where a following ramp starts
    fn anchor(self) -> (f64, f32) {
        match self {
            Segment::Hold { time, value } => (time, value),
            Segment::Target { start, from, .. } => (start, from),
        }
    }
}

/// Linear interpolation between two (time, value) points
#[inline]
fn lerp(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    if t1 <= t0 {
        return v1;
    }
    let frac = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0) as f32;
    v0 + (v1 - v0) * frac
}

/// Geometric interpolation; only defined for strictly positive endpoints
#[inline]
fn exp_interp(t0: f64, v0: f32, t1: f64, v1: f32, t: f64) -> f32 {
    if v0 <= 0.0 || v1 <= 0.0 {
        return lerp(t0, v0, t1, v1, t);
    }
    if t1 <= t0 {
        return v1;
    }
    let frac = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0) as f32;
    v0 * (v1 / v0).powf(frac)
}

/// A scheduled parameter curve (gain, frequency, ...)
#[derive(Debug, Clone)]
pub struct Automation {
    default_value: f32,
    events: Vec<Event>,
}

impl Automation {
    /// Create an automation that holds `default_value` until the first event
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            // Enough for a full envelope plus a stop fade without reallocating
            events: Vec::with_capacity(8),
        }
    }

    fn insert(&mut self, event: Event) {
        // Events at equal times keep insertion order
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }

    pub fn set_value_at(&mut self, value: f32, time: f64) {
        self.insert(Event {
            time,
            value,
            kind: EventKind::SetValue,
        });
    }

    pub fn linear_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(Event {
            time: end_time,
            value,
            kind: EventKind::LinearRamp,
        });
    }

    pub fn exponential_ramp_to(&mut self, value: f32, end_time: f64) {
        self.insert(Event {
            time: end_time,
            value,
            kind: EventKind::ExponentialRamp,
        });
    }

    pub fn set_target_at(&mut self, target: f32, start_time: f64, time_constant: f64) {
        self.insert(Event {
            time: start_time,
            value: target,
            kind: EventKind::SetTarget { time_constant },
        });
    }

    /// Remove every event at or after `time`
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time < time);
    }

    /// Freeze the curve at its current value: cancel everything from `time`
    /// on and pin the value the curve had at that instant.
    pub fn cancel_and_hold_at(&mut self, time: f64) -> f32 {
        let held = self.value_at(time);
        self.cancel_scheduled_values(time);
        self.set_value_at(held, time);
        held
    }

    /// Drop the whole timeline and continue from `value` at `time`
    ///
    /// Keeps the event storage, so a long-lived parameter (master gain)
    /// doesn't grow without bound or reallocate.
    pub fn restart_at(&mut self, value: f32, time: f64) {
        self.events.clear();
        self.set_value_at(value, time);
    }

    /// Number of scheduled events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Evaluate the curve at time `t` (seconds)
    pub fn value_at(&self, t: f64) -> f32 {
        let mut segment = Segment::Hold {
            time: f64::NEG_INFINITY,
            value: self.default_value,
        };

        for event in &self.events {
            if event.time > t {
                // A ramp ending in the future is in progress right now
                let (t0, v0) = segment.anchor();
                // A ramp with no earlier event starts at the clock origin
                let t0 = if t0.is_finite() { t0 } else { 0.0 };
                return match event.kind {
                    EventKind::LinearRamp => lerp(t0, v0, event.time, event.value, t),
                    EventKind::ExponentialRamp => {
                        exp_interp(t0, v0, event.time, event.value, t)
                    }
                    EventKind::SetValue | EventKind::SetTarget { .. } => segment.value_at(t),
                };
            }

            segment = match event.kind {
                EventKind::SetValue | EventKind::LinearRamp | EventKind::ExponentialRamp => {
                    Segment::Hold {
                        time: event.time,
                        value: event.value,
                    }
                }
                EventKind::SetTarget { time_constant } => Segment::Target {
                    start: event.time,
                    from: segment.value_at(event.time),
                    target: event.value,
                    time_constant,
                },
            };
        }

        segment.value_at(t)
    }
}
