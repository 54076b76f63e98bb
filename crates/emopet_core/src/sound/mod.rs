//! Sound Engine
//!
//! Per-emotion presets built from chirps and noise bursts, the voice
//! registry, cancellable loop timers and the engine tying them to one
//! audio output.

mod engine;
mod preset;
mod scheduler;
mod voices;

pub use engine::SoundEngine;
pub use preset::{
    sound_presets, EmotionSoundPreset, LoopInterval, VoiceBuilder, MIN_FIXED_INTERVAL_MS,
    MIN_RANGE_INTERVAL_MS, MIN_RANGE_SPREAD_MS,
};
pub use scheduler::{TimerId, TimerQueue};
pub use voices::{VoiceFactory, VoiceHandle, VoiceRegistry};
