//! EmoPet Core - Emotion-Driven Eyes and Voice
//!
//! This crate provides the two engines behind the pet:
//! - The animation engine: per-frame eye geometry from the emotion, gaze,
//!   microphone level, blinks and taps
//! - The sound engine: self-rescheduling bursts of synthesized chirps and
//!   noise per emotion
//! - Audio output over CPAL, or rendered offline
//! - Microphone level capture
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Host loop                           │
//! │   emotion ──▶ AnimationEngine::tick ──▶ Frame (SVG)         │
//! │   emotion ──▶ SoundEngine::play / advance                   │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲ rtrb                           │ crossbeam-channel
//!          │                                ▼
//! ┌─────────────────┐            ┌──────────────────────────────┐
//! │  Input callback │            │        Output callback       │
//! │  (microphone)   │            │  Mixer ──▶ SoftClipper ──▶   │
//! └─────────────────┘            └──────────────────────────────┘
//!                    (Zero allocation in the callbacks)
//! ```

pub mod animation;
mod clock;
mod config;
mod device;
mod emotion;
mod error;
mod mic;
mod output;
pub mod sound;
mod stream;

pub use animation::{AnimationEngine, EyeColor, Frame};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AnimationConfig, EngineConfig, MicConfig, SoundConfig, StreamConfig};
pub use device::{AudioDevice, DeviceType};
pub use emotion::{Emotion, EmotionTable, ParseEmotionError};
pub use error::{EngineError, EngineResult};
pub use mic::MicLevel;
pub use output::{unavailable, AudioOutput, OfflineOutput, OutputFactory, OutputState};
pub use sound::SoundEngine;
pub use stream::{DeviceOutput, SharedState};

// Re-export DSP types for convenience
pub use emopet_dsp::{ChirpParams, MixerCommand, NoiseParams, SweepCurve, Vibrato, Waveform};
