//! EmoPet DSP - Sound Synthesis Module
//!
//! This crate provides the signal path behind the pet's voice:
//! - Web-Audio-style parameter automation (steps, ramps, target curves)
//! - Chirp voices (swept oscillators with ADSR and vibrato) and noise bursts
//! - A voice mixer that owns the output clock and the master gain
//! - Soft clipping so stacked voices never hard-clip
//! - An FFT level meter for the microphone input
//!
//! # Architecture
//!
//! Voices are built on the control thread with absolute start times and sent
//! to the mixer as [`MixerCommand`]s. Rendering follows a strict
//! "no allocation in audio callback" rule.

mod automation;
mod error;
mod level;
mod mixer;
mod noise;
mod oscillator;
mod soft_clip;
mod voice;

pub use automation::{Automation, SILENCE};
pub use error::DspError;
pub use level::{LevelMeter, LEVEL_FFT_SIZE, LEVEL_SMOOTHING};
pub use mixer::{Mixer, MixerCommand, MAX_VOICES};
pub use noise::NoiseCache;
pub use oscillator::{Oscillator, Waveform};
pub use soft_clip::{SoftClipper, DEFAULT_THRESHOLD_DB};
pub use voice::{
    pan_gains, ChirpParams, FadeOut, NoiseParams, SweepCurve, Vibrato, Voice, VoiceId,
};
