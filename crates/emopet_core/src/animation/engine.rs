//! Animation Engine - per-frame eye synthesis
//!
//! The host owns the refresh loop and calls [`AnimationEngine::tick`] once
//! per display frame. Every time-dependent signal inside a tick reads the
//! same timestamp, so both eyes are always drawn from one consistent
//! instant.
//!
//! ```text
//! pointer / mic / tap ──▶ AnimationEngine ──tick(now)──▶ Frame ──▶ SVG
//!                              │
//!                              ├─ Gaze (smoothed offset)
//!                              ├─ Blinker (deadline timers)
//!                              └─ EmotionTable<EmotionConfig>
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, trace};

use super::blink::{BlinkState, Blinker, TAP_BLINK_MS};
use super::config::{emotion_configs, EmotionConfig, EyeColor, GlowFilter};
use super::geometry::{synthesize_eye, EyeGeometry, EyeInputs, Side};
use super::signals::{self, Bounds, Gaze, Vec2, MAX_GAZE_OFFSET};
use crate::config::AnimationConfig;
use crate::emotion::{Emotion, EmotionTable};

/// How long the tap pulse stays raised
pub const TAP_PULSE_MS: f64 = 200.0;
/// Horizontal range of the glance a tap triggers
pub const TAP_GAZE_X: f32 = 7.5;
/// Head tilt range (degrees) of the tap jolt
pub const TAP_TILT: f32 = 2.5;
/// Eye growth at full microphone level
pub const AUDIO_SCALE_STRENGTH: f32 = 0.1;

const ANGRY_FRAME_MS: f64 = 80.0;
const ANGRY_FRAME_COUNT: u32 = 20;

/// Everything needed to draw one frame
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    /// Timestamp the frame was computed for
    pub time_ms: f64,
    pub emotion: Emotion,
    pub left: EyeGeometry,
    pub right: EyeGeometry,
    /// Head rotation in degrees
    pub head_tilt: f32,
    /// Positional wobble applied to both eyes this frame
    pub jitter: Vec2,
    pub eye_color: EyeColor,
    pub fill: &'static str,
    pub glow: Option<GlowFilter>,
    /// Blur standard deviation of the glow at this instant
    pub glow_strength: f32,
    /// Angry layout frame counter, 0 for every other emotion
    pub glow_phase: u32,
    /// Raised briefly after a tap
    pub tap_pulse: bool,
    pub blinking: bool,
}

/// Procedural eye animation for one character
pub struct AnimationEngine {
    table: EmotionTable<EmotionConfig>,
    emotion: Emotion,
    eye_color: EyeColor,
    eye_scale: f32,
    gaze: Gaze,
    blinker: Blinker,
    audio_level: f32,
    tilt_override: Option<f32>,
    tap_pulse_until: f64,
    rng: StdRng,
    shut_down: bool,
}

impl AnimationEngine {
    /// Create an engine drawing randomness from `rng`
    pub fn new(config: &AnimationConfig, mut rng: StdRng) -> Self {
        let blinker = Blinker::new(&mut rng, config.blinking);
        debug!(
            "Animation engine: eye scale {}, blink interval {:.0}ms",
            config.eye_scale,
            blinker.interval_ms()
        );

        Self {
            table: emotion_configs(),
            emotion: Emotion::Neutral,
            eye_color: EyeColor::Default,
            eye_scale: config.eye_scale,
            gaze: Gaze::default(),
            blinker,
            audio_level: 0.0,
            tilt_override: None,
            tap_pulse_until: f64::NEG_INFINITY,
            rng,
            shut_down: false,
        }
    }

    /// Create an engine seeded from the configuration (or OS entropy)
    pub fn from_config(config: &AnimationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self::new(config, rng)
    }

    /// Replace the emotion table, e.g. with user overrides
    pub fn with_table(mut self, table: EmotionTable<EmotionConfig>) -> Self {
        self.table = table;
        self
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn set_emotion(&mut self, emotion: Emotion) {
        if emotion != self.emotion {
            debug!("Animation emotion: {} -> {}", self.emotion, emotion);
            self.emotion = emotion;
        }
    }

    pub fn eye_color(&self) -> EyeColor {
        self.eye_color
    }

    pub fn set_eye_color(&mut self, color: EyeColor) {
        self.eye_color = color;
    }

    /// Follow a pointer at `pointer` (same coordinate space as `bounds`)
    pub fn pointer_moved(&mut self, pointer: Vec2, bounds: &Bounds) {
        self.gaze.pointer = signals::pointer_offset(pointer, bounds);
    }

    /// Pointer left the character; gaze returns to idle wandering
    pub fn pointer_left(&mut self) {
        self.gaze.pointer = Vec2::ZERO;
    }

    /// Current microphone level, clamped to [0, 1]
    pub fn set_audio_level(&mut self, level: f32) {
        self.audio_level = if level.is_finite() {
            level.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn audio_level(&self) -> f32 {
        self.audio_level
    }

    /// React to a tap: quick blink, glance up, head jolt and a visual pulse
    pub fn tap(&mut self, now_ms: f64) {
        trace!("tap at {now_ms:.0}ms");
        self.blinker.force(now_ms, TAP_BLINK_MS);
        self.gaze.current = Vec2::new(
            self.rng.gen_range(-TAP_GAZE_X..=TAP_GAZE_X),
            -MAX_GAZE_OFFSET,
        );
        self.tilt_override = Some(self.rng.gen_range(-TAP_TILT..=TAP_TILT));
        self.tap_pulse_until = now_ms + TAP_PULSE_MS;
    }

    pub fn blink_state(&self) -> BlinkState {
        self.blinker.state()
    }

    pub fn gaze(&self) -> Vec2 {
        self.gaze.current
    }

    /// Blink timers still armed
    pub fn pending_timers(&self) -> usize {
        self.blinker.pending_timers()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Cancel every blink timer; later ticks render open eyes
    pub fn shutdown(&mut self) {
        if !self.shut_down {
            debug!("Animation engine shut down");
            self.blinker.cancel();
            self.shut_down = true;
        }
    }

    /// Compute the frame for `now_ms`
    pub fn tick(&mut self, now_ms: f64) -> Frame {
        let blinking = self.blinker.update(now_ms, &mut self.rng);
        self.gaze.step(&mut self.rng);

        let config = *self.table.get(self.emotion);
        let jitter = signals::jitter(&mut self.rng, config.jitter_intensity());
        let head_tilt = match self.tilt_override.take() {
            Some(tilt) => tilt,
            None => signals::head_tilt(&mut self.rng, now_ms, config.head_tilt_intensity()),
        };

        let emotion_scale =
            config.pulse_base_scale() + signals::pulse(now_ms) * config.pulse_amplitude();
        let audio_scale = 1.0 + self.audio_level * AUDIO_SCALE_STRENGTH;
        let inputs = EyeInputs {
            jitter,
            size_scale: signals::breathing(now_ms) * audio_scale * emotion_scale,
            gaze: self.gaze.current,
            blinking,
        };

        let left = synthesize_eye(
            Side::Left,
            config.left_eye.scaled_about_center(self.eye_scale),
            &inputs,
        );
        let right = synthesize_eye(
            Side::Right,
            config.right_eye.scaled_about_center(self.eye_scale),
            &inputs,
        );

        let angry = self.emotion == Emotion::Angry;
        let glow = if angry { Some(GlowFilter::Glow) } else { config.filter };
        let glow_phase = if angry {
            ((now_ms.max(0.0) / ANGRY_FRAME_MS) as u64 % u64::from(ANGRY_FRAME_COUNT)) as u32
        } else {
            0
        };

        Frame {
            time_ms: now_ms,
            emotion: self.emotion,
            left,
            right,
            head_tilt,
            jitter,
            eye_color: self.eye_color,
            fill: self.eye_color.fill(),
            glow,
            glow_strength: glow.map_or(0.0, |g| g.strength_at(now_ms)),
            glow_phase,
            tap_pulse: now_ms < self.tap_pulse_until,
            blinking,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(seed: u64) -> AnimationEngine {
        AnimationEngine::new(&AnimationConfig::default(), StdRng::seed_from_u64(seed))
    }

    const BOUNDS: Bounds = Bounds {
        left: 0.0,
        top: 0.0,
        width: 300.0,
        height: 300.0,
    };

    #[test]
    fn test_angry_first_frame_bounds() {
        for seed in 0..50 {
            let mut engine = engine(seed);
            engine.set_emotion(Emotion::Angry);
            engine.pointer_moved(BOUNDS.center(), &BOUNDS);
            engine.set_audio_level(0.0);

            let frame = engine.tick(0.0);
            let base = EmotionConfig::builtin(Emotion::Angry)
                .left_eye
                .scaled_about_center(1.5);
            let offset = Vec2::new(frame.left.rect.x - base.x, frame.left.rect.y - base.y);

            assert_eq!(engine.gaze(), Vec2::ZERO);
            assert!(offset.x.abs() <= 1.5 * 1.2 && offset.y.abs() <= 1.5 * 1.2);
            assert!(frame.head_tilt.abs() <= 1.5 * 2.0 + 1.5 * 0.5);
            assert_eq!(frame.glow, Some(GlowFilter::Glow));
        }
    }

    #[test]
    fn test_missing_config_renders_neutral() {
        let table = EmotionTable::partial(EmotionConfig::builtin(Emotion::Neutral), []);
        let mut sparse = engine(7).with_table(table);
        let mut neutral = engine(7);

        sparse.set_emotion(Emotion::Surprised);
        neutral.set_emotion(Emotion::Neutral);
        for i in 0..20 {
            let t = f64::from(i) * 16.0;
            let a = sparse.tick(t);
            let b = neutral.tick(t);
            assert_eq!(a.left, b.left);
            assert_eq!(a.right, b.right);
            assert_eq!(a.head_tilt, b.head_tilt);
            assert_eq!(a.glow, b.glow);
        }
    }

    #[test]
    fn test_zero_gaze_symmetric_scale() {
        let mut engine = engine(3);
        engine.pointer_moved(BOUNDS.center(), &BOUNDS);
        let frame = engine.tick(0.0);
        assert_eq!(frame.left.scale, frame.right.scale);
    }

    #[test]
    fn test_blink_collapses_then_restores() {
        let mut engine = engine(12);
        let mut t = 0.0;
        let mut before = None;

        while !engine.blink_state().is_blinking() {
            t += 16.0;
            let frame = engine.tick(t);
            if !frame.blinking {
                before = Some(frame.left.scale_y);
            }
            assert!(t < 10_000.0, "no blink within the interval");
        }

        let until = match engine.blink_state() {
            BlinkState::Blinking { until, .. } => until,
            BlinkState::Open => unreachable!(),
        };
        let during = engine.tick(t);
        assert!(during.blinking);
        assert!(during.left.scale_y <= 0.01 * before.unwrap_or(1.0));
        assert!(during.right.scale_y <= 0.01);
        assert_eq!(during.left.highlight.opacity, 0.0);

        let after = engine.tick(until);
        assert!(!after.blinking);
        assert_eq!(after.left.scale_y, 1.0);
        assert_eq!(after.left.highlight.opacity, 1.0);
    }

    #[test]
    fn test_tap_effects() {
        let mut engine = engine(5);
        engine.tick(0.0);
        engine.tap(100.0);

        assert_eq!(engine.gaze().y, -10.0);
        assert!(engine.gaze().x.abs() <= 7.5);

        let frame = engine.tick(100.0);
        assert!(frame.blinking);
        assert!(frame.tap_pulse);
        assert!(frame.head_tilt.abs() <= 2.5);

        let frame = engine.tick(220.0);
        assert!(!frame.blinking);
        assert!(frame.tap_pulse);

        let frame = engine.tick(300.0);
        assert!(!frame.tap_pulse);
        assert_eq!(engine.blink_state(), BlinkState::Open);
    }

    #[test]
    fn test_audio_level_grows_eyes() {
        let mut quiet = engine(9);
        let mut loud = engine(9);
        quiet.set_audio_level(0.0);
        loud.set_audio_level(3.0);
        assert_eq!(loud.audio_level(), 1.0);

        let a = quiet.tick(0.0);
        let b = loud.tick(0.0);
        assert!((b.left.scale / a.left.scale - 1.1).abs() < 1e-4);
    }

    #[test]
    fn test_angry_glow_phase() {
        let mut engine = engine(1);
        engine.set_emotion(Emotion::Angry);
        assert_eq!(engine.tick(0.0).glow_phase, 0);
        assert_eq!(engine.tick(85.0).glow_phase, 1);
        assert_eq!(engine.tick(80.0 * 21.0).glow_phase, 1);

        engine.set_emotion(Emotion::Happy);
        let frame = engine.tick(500.0);
        assert_eq!(frame.glow_phase, 0);
        assert_eq!(frame.glow, Some(GlowFilter::SubtlePulseGlow));
    }

    #[test]
    fn test_shutdown_stops_blinking() {
        let mut engine = engine(2);
        engine.tick(0.0);
        assert!(engine.pending_timers() > 0);

        engine.shutdown();
        assert_eq!(engine.pending_timers(), 0);
        for i in 0..1000 {
            let frame = engine.tick(f64::from(i) * 16.0);
            assert!(!frame.blinking);
        }
        assert_eq!(engine.pending_timers(), 0);
    }

    #[test]
    fn test_eye_color_fill() {
        let mut engine = engine(4);
        engine.set_eye_color(EyeColor::Red);
        assert_eq!(engine.tick(0.0).fill, "hsl(0 84.2% 60.2%)");
    }
}
