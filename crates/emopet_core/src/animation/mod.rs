//! Animation Engine
//!
//! Emotion-driven eye animation: per-emotion geometry table, continuous
//! signals (gaze, jitter, breathing, tilt, pulse), the blink state machine
//! and the per-frame synthesis of both eyes.

mod blink;
mod config;
mod engine;
mod geometry;
mod signals;
mod svg;

pub use blink::{
    BlinkState, Blinker, BLINK_DURATION_MS, BLINK_INTERVAL_MS, DOUBLE_BLINK_CHANCE,
    DOUBLE_BLINK_DELAY_MS, TAP_BLINK_MS,
};
pub use config::{
    emotion_configs, EmotionConfig, EyeColor, EyeRect, GlowFilter, DEFAULT_HEAD_TILT_INTENSITY,
    DEFAULT_JITTER_INTENSITY, DEFAULT_PULSE_AMPLITUDE, DEFAULT_PULSE_BASE_SCALE,
};
pub use engine::{AnimationEngine, Frame, AUDIO_SCALE_STRENGTH, TAP_PULSE_MS};
pub use geometry::{synthesize_eye, EyeGeometry, EyeInputs, Highlight, Side, BLINK_SCALE_Y};
pub use signals::{pointer_offset, Bounds, Gaze, Vec2, MAX_GAZE_OFFSET};
pub use svg::VIEW_BOX;
