//! Continuous animation signals
//!
//! Everything here is a small pure function of the frame timestamp and the
//! engine's random source, so a whole frame is derived from one clock read.

use std::ops::{Add, Mul, Sub};

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Largest gaze offset on either axis (view box units)
pub const MAX_GAZE_OFFSET: f32 = 10.0;
/// Pointer delta (pixels) → gaze offset factor
pub const POINTER_GAZE_FACTOR: f32 = 0.1;
/// Per-frame smoothing factor range for the displayed gaze
pub const GAZE_SMOOTHING_MIN: f32 = 0.15;
pub const GAZE_SMOOTHING_MAX: f32 = 0.20;
/// Chance per frame of picking a new idle gaze target
pub const RANDOM_GAZE_CHANCE: f64 = 0.02;

const BREATHING_PERIOD_MS: f64 = 800.0;
const BREATHING_DEPTH: f32 = 0.015;
const TILT_PERIOD_MS: f64 = 2000.0;
const PULSE_PERIOD_MS: f64 = 400.0;

/// 2-D offset
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// On-screen bounding box of the character
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Gaze target for a pointer at `pointer` relative to the character
pub fn pointer_offset(pointer: Vec2, bounds: &Bounds) -> Vec2 {
    let delta = pointer - bounds.center();
    Vec2::new(
        (delta.x * POINTER_GAZE_FACTOR).clamp(-MAX_GAZE_OFFSET, MAX_GAZE_OFFSET),
        (delta.y * POINTER_GAZE_FACTOR).clamp(-MAX_GAZE_OFFSET, MAX_GAZE_OFFSET),
    )
}

/// Where the eyes are looking
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Gaze {
    /// Pointer-derived target; zero while the pointer is away
    pub pointer: Vec2,
    /// Idle wandering target
    pub wander: Vec2,
    /// Smoothed offset actually drawn
    pub current: Vec2,
}

impl Gaze {
    /// Target per axis: the pointer where it's non-zero, otherwise the wander
    pub fn target(&self) -> Vec2 {
        Vec2::new(
            if self.pointer.x != 0.0 { self.pointer.x } else { self.wander.x },
            if self.pointer.y != 0.0 { self.pointer.y } else { self.wander.y },
        )
    }

    /// Advance one frame: jittered low-pass towards the target, then maybe
    /// pick a new wander target while the pointer is idle
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let target = self.target();
        let smoothing = rng.gen_range(GAZE_SMOOTHING_MIN..=GAZE_SMOOTHING_MAX);
        self.current = smooth_toward(self.current, target, smoothing);

        if rng.gen_bool(RANDOM_GAZE_CHANCE) && self.pointer.is_zero() {
            self.wander = Vec2::new(
                rng.gen_range(-MAX_GAZE_OFFSET..=MAX_GAZE_OFFSET),
                rng.gen_range(-MAX_GAZE_OFFSET..=MAX_GAZE_OFFSET),
            );
        }
    }
}

/// One step of exponential smoothing
#[inline]
pub fn smooth_toward(current: Vec2, target: Vec2, factor: f32) -> Vec2 {
    current + (target - current) * factor
}

/// Random positional wobble, asymmetric per axis so it never looks periodic
pub fn jitter<R: Rng + ?Sized>(rng: &mut R, intensity: f32) -> Vec2 {
    let x_bias = if rng.gen_bool(0.5) { 1.2 } else { 0.8 };
    let x = (rng.gen::<f32>() - 0.5) * intensity * x_bias;
    let y_bias = if rng.gen_bool(0.5) { 1.1 } else { 0.9 };
    let y = (rng.gen::<f32>() - 0.5) * intensity * y_bias;
    Vec2::new(x, y)
}

/// Uniform breathing scale, ±1.5 %
pub fn breathing(now_ms: f64) -> f32 {
    1.0 + (now_ms / BREATHING_PERIOD_MS).sin() as f32 * BREATHING_DEPTH
}

/// Head tilt in degrees: slow sway plus a little per-frame noise
pub fn head_tilt<R: Rng + ?Sized>(rng: &mut R, now_ms: f64, intensity: f32) -> f32 {
    let sway = (now_ms / TILT_PERIOD_MS).sin() as f32 * 2.0 * intensity;
    sway + (rng.gen::<f32>() - 0.5) * 0.5 * intensity
}

/// Emotion pulse phase in [-1, 1]
pub fn pulse(now_ms: f64) -> f32 {
    (now_ms / PULSE_PERIOD_MS).sin() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const BOUNDS: Bounds = Bounds {
        left: 0.0,
        top: 0.0,
        width: 320.0,
        height: 320.0,
    };

    #[test]
    fn test_pointer_offset_scaled_and_clamped() {
        let near = pointer_offset(Vec2::new(190.0, 130.0), &BOUNDS);
        assert!((near.x - 3.0).abs() < 1e-5);
        assert!((near.y + 3.0).abs() < 1e-5);

        let far = pointer_offset(Vec2::new(2000.0, -2000.0), &BOUNDS);
        assert_eq!(far, Vec2::new(10.0, -10.0));
    }

    #[test]
    fn test_target_prefers_pointer_per_axis() {
        let gaze = Gaze {
            pointer: Vec2::new(4.0, 0.0),
            wander: Vec2::new(-2.0, 6.0),
            current: Vec2::ZERO,
        };
        assert_eq!(gaze.target(), Vec2::new(4.0, 6.0));
    }

    #[test]
    fn test_gaze_step_never_overshoots() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut gaze = Gaze::default();
        let targets = [
            Vec2::new(10.0, -10.0),
            Vec2::new(-7.0, 3.0),
            Vec2::new(0.5, 9.0),
        ];

        for pointer in targets {
            gaze.pointer = pointer;
            for _ in 0..30 {
                let before = (gaze.current - pointer).length();
                gaze.step(&mut rng);
                let after = (gaze.current - pointer).length();
                assert!(after <= before * (1.0 - GAZE_SMOOTHING_MIN) + 1e-4);
            }
        }
    }

    #[test]
    fn test_wander_only_while_pointer_idle() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut gaze = Gaze {
            pointer: Vec2::new(1.0, 1.0),
            ..Default::default()
        };
        for _ in 0..2000 {
            gaze.step(&mut rng);
        }
        assert_eq!(gaze.wander, Vec2::ZERO);

        gaze.pointer = Vec2::ZERO;
        for _ in 0..2000 {
            gaze.step(&mut rng);
        }
        assert!(!gaze.wander.is_zero());
        assert!(gaze.wander.x.abs() <= MAX_GAZE_OFFSET);
        assert!(gaze.wander.y.abs() <= MAX_GAZE_OFFSET);
    }

    #[test]
    fn test_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1000 {
            let j = jitter(&mut rng, 1.5);
            assert!(j.x.abs() <= 0.5 * 1.5 * 1.2);
            assert!(j.y.abs() <= 0.5 * 1.5 * 1.1);
        }
    }

    #[test]
    fn test_periodic_signals() {
        assert_eq!(breathing(0.0), 1.0);
        for t in [100.0, 1234.5, 99_999.0] {
            let b = breathing(t);
            assert!((0.985..=1.015).contains(&b));
            assert!((-1.0..=1.0).contains(&pulse(t)));
        }

        let mut rng = StdRng::seed_from_u64(1);
        for t in [0.0, 3141.0, 50_000.0] {
            let tilt = head_tilt(&mut rng, t, 0.4);
            assert!(tilt.abs() <= 0.4 * 2.0 + 0.4 * 0.25 + 1e-6);
        }
    }
}
