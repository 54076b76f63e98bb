//! Per-emotion sound presets
//!
//! Each preset layers a few chirps and noise bursts with per-call random
//! variation, so consecutive bursts of the same emotion never sound like a
//! literal loop.

use std::fmt;

use rand::Rng;

use emopet_dsp::{ChirpParams, NoiseParams, SweepCurve, Vibrato, Waveform};

use super::voices::{VoiceFactory, VoiceHandle};
use crate::emotion::{Emotion, EmotionTable};

/// Shortest fixed loop delay (ms)
pub const MIN_FIXED_INTERVAL_MS: f64 = 200.0;
/// Floor for the lower bound of a random loop delay (ms)
pub const MIN_RANGE_INTERVAL_MS: f64 = 120.0;
/// Smallest spread of a random loop delay (ms)
pub const MIN_RANGE_SPREAD_MS: f64 = 60.0;

/// Delay between the start of one burst and the next
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopInterval {
    Fixed(f64),
    /// Uniform in `[min, max]`; a missing `min` falls back to the previous
    /// burst's length and a missing `max` to `min`
    Range { min: Option<f64>, max: Option<f64> },
}

impl LoopInterval {
    pub const fn range(min: f64, max: f64) -> Self {
        LoopInterval::Range {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Draw a concrete delay in milliseconds
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R, fallback_secs: f32) -> u64 {
        match *self {
            LoopInterval::Fixed(ms) => ms.max(MIN_FIXED_INTERVAL_MS).round() as u64,
            LoopInterval::Range { min, max } => {
                let low = min
                    .unwrap_or(f64::from(fallback_secs) * 1000.0)
                    .max(MIN_RANGE_INTERVAL_MS);
                let high = max.or(min).unwrap_or(low).max(low + MIN_RANGE_SPREAD_MS);
                rng.gen_range(low.round() as u64..=high.round() as u64)
            }
        }
    }
}

/// Builds one burst of voices
pub type VoiceBuilder = fn(&mut VoiceFactory<'_>) -> Vec<VoiceHandle>;

/// How one emotion sounds
#[derive(Clone, Copy)]
pub struct EmotionSoundPreset {
    pub voices: VoiceBuilder,
    /// `None` plays a single burst and stops
    pub loop_interval: Option<LoopInterval>,
    /// Master gain the engine glides to when this preset plays
    pub base_gain: Option<f32>,
}

impl fmt::Debug for EmotionSoundPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmotionSoundPreset")
            .field("loop_interval", &self.loop_interval)
            .field("base_gain", &self.base_gain)
            .finish_non_exhaustive()
    }
}

impl EmotionSoundPreset {
    /// Built-in preset for `emotion`
    pub fn builtin(emotion: Emotion) -> Self {
        use Emotion::*;

        #[rustfmt::skip]
        let (voices, gain, (min, max)): (VoiceBuilder, f32, (f64, f64)) = match emotion {
            Neutral => (neutral, 0.18, (4200.0, 5800.0)),
            Happy => (happy, 0.24, (2400.0, 3200.0)),
            Sad => (sad, 0.16, (5200.0, 6400.0)),
            Sleepy => (sleepy, 0.14, (7600.0, 9000.0)),
            Angry => (angry, 0.28, (1900.0, 2300.0)),
            Curious => (curious, 0.2, (3200.0, 4200.0)),
            Bored => (bored, 0.15, (6200.0, 7600.0)),
            Scared => (scared, 0.26, (1800.0, 2400.0)),
            Calm => (calm, 0.19, (900.0, 1200.0)),
            Love => (love, 0.22, (3400.0, 4200.0)),
            Excited => (excited, 0.26, (1800.0, 2400.0)),
            Confused => (confused, 0.2, (3600.0, 4600.0)),
            Surprised => (surprised, 0.24, (3200.0, 3800.0)),
            Annoyed => (annoyed, 0.22, (2600.0, 3400.0)),
            Shy => (shy, 0.16, (5200.0, 6500.0)),
            Proud => (proud, 0.24, (3600.0, 4400.0)),
            Silly => (silly, 0.25, (2600.0, 3400.0)),
            Determined => (determined, 0.21, (2800.0, 3600.0)),
            Worried => (worried, 0.2, (3000.0, 3800.0)),
            Playful => (playful, 0.25, (2200.0, 3000.0)),
        };

        Self {
            voices,
            loop_interval: Some(LoopInterval::range(min, max)),
            base_gain: Some(gain),
        }
    }
}

/// The built-in presets for all 20 emotions
pub fn sound_presets() -> EmotionTable<EmotionSoundPreset> {
    EmotionTable::full(EmotionSoundPreset::builtin)
}

/// Chirp with explicit envelope; offset, pan and vibrato default to none
fn tone(
    start: f32,
    end: f32,
    duration: f32,
    wave: Waveform,
    [attack, decay, sustain, release]: [f32; 4],
    volume: f32,
) -> ChirpParams {
    ChirpParams {
        start_freq: start,
        end_freq: Some(end),
        duration,
        wave,
        volume,
        attack,
        decay,
        sustain,
        release,
        ..Default::default()
    }
}

fn neutral(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let base = f.random(360.0, 420.0);
    let first = ChirpParams {
        pan: f.random(-0.2, 0.2),
        ..tone(base, base * f.random(1.05, 1.12), 0.6, Waveform::Triangle, [0.04, 0.18, 0.55, 0.28], 0.085)
    };
    let second = ChirpParams {
        offset: 0.38,
        pan: f.random(-0.25, 0.25),
        ..tone(base * 0.9, base * 0.82, 0.4, Waveform::Sine, [0.03, 0.12, 0.5, 0.22], 0.07)
    };
    vec![f.chirp(first), f.chirp(second)]
}

fn happy(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let count = f.random_count(2, 3);
    let mut handles = Vec::with_capacity(count);
    for i in 0..count {
        let start = f.random(520.0, 650.0);
        let params = ChirpParams {
            offset: i as f32 * f.random(0.18, 0.26),
            vibrato: Some(Vibrato::new(f.random(7.0, 9.0), 6.0)),
            pan: f.random(-0.6, 0.6),
            ..tone(start, start * f.random(1.5, 1.7), 0.35, Waveform::Sine, [0.015, 0.09, 0.5, 0.18], 0.12)
        };
        handles.push(f.chirp(params));
    }
    handles
}

fn sad(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let start = f.random(240.0, 280.0);
    let params = ChirpParams {
        sweep: SweepCurve::Linear,
        vibrato: Some(Vibrato::new(4.5, 4.0)),
        pan: f.random(-0.2, 0.2),
        ..tone(start, start * f.random(0.6, 0.7), 0.9, Waveform::Sine, [0.04, 0.22, 0.45, 0.4], 0.08)
    };
    vec![f.chirp(params)]
}

fn sleepy(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let params = ChirpParams {
        vibrato: Some(Vibrato::new(2.5, 3.0)),
        pan: f.random(-0.1, 0.1),
        ..tone(f.random(180.0, 210.0), f.random(150.0, 190.0), 1.4, Waveform::Sine, [0.25, 0.6, 0.4, 0.6], 0.07)
    };
    vec![f.chirp(params)]
}

fn angry(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let bursts = f.random_count(2, 3);
    let mut handles = Vec::with_capacity(bursts * 2);
    for i in 0..bursts {
        let offset = i as f32 * 0.18;
        let start = f.random(420.0, 520.0);
        let growl = ChirpParams {
            offset,
            vibrato: Some(Vibrato::new(16.0, 12.0)),
            pan: f.random(-0.5, 0.5),
            ..tone(start, start * f.random(1.3, 1.4), 0.25, Waveform::Square, [0.01, 0.08, 0.4, 0.12], 0.16)
        };
        handles.push(f.chirp(growl));

        let hiss = NoiseParams {
            offset: offset + 0.05,
            duration: 0.18,
            volume: 0.08,
            attack: 0.005,
            release: 0.1,
            pan: f.random(-0.4, 0.4),
        };
        handles.push(f.noise_burst(hiss));
    }
    handles
}

fn curious(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let rise = ChirpParams {
        pan: f.random(-0.4, 0.4),
        ..tone(f.random(380.0, 430.0), f.random(600.0, 680.0), 0.45, Waveform::Triangle, [0.02, 0.12, 0.5, 0.18], 0.09)
    };
    let fall = ChirpParams {
        offset: 0.36,
        vibrato: Some(Vibrato::new(6.0, 5.0).with_delay(0.05)),
        pan: f.random(-0.3, 0.3),
        ..tone(f.random(650.0, 720.0), f.random(320.0, 360.0), 0.5, Waveform::Sine, [0.03, 0.1, 0.45, 0.22], 0.085)
    };
    vec![f.chirp(rise), f.chirp(fall)]
}

fn bored(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let sigh = ChirpParams {
        vibrato: Some(Vibrato::new(3.0, 2.0)),
        pan: f.random(-0.2, 0.2),
        ..tone(f.random(220.0, 260.0), f.random(210.0, 230.0), 0.7, Waveform::Sine, [0.12, 0.4, 0.35, 0.35], 0.06)
    };
    vec![f.chirp(sigh)]
}

fn scared(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let mut handles = Vec::with_capacity(4);
    for i in 0..3 {
        let squeak = ChirpParams {
            offset: i as f32 * 0.12,
            vibrato: Some(Vibrato::new(14.0, 18.0)),
            pan: f.random(-0.7, 0.7),
            ..tone(f.random(720.0, 860.0), f.random(900.0, 1040.0), 0.25, Waveform::Sine, [0.008, 0.06, 0.3, 0.14], 0.11)
        };
        handles.push(f.chirp(squeak));
    }
    let gasp = NoiseParams {
        offset: 0.05,
        duration: 0.25,
        volume: 0.06,
        attack: 0.01,
        release: 0.18,
        pan: f.random(-0.5, 0.5),
    };
    handles.push(f.noise_burst(gasp));
    handles
}

fn calm(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let hum = ChirpParams {
        vibrato: Some(Vibrato::new(5.0, 4.0)),
        pan: f.random(-0.15, 0.15),
        ..tone(f.random(160.0, 190.0), f.random(180.0, 210.0), 1.4, Waveform::Sine, [0.18, 0.5, 0.5, 0.5], 0.07)
    };
    let pad = ChirpParams {
        offset: 0.45,
        pan: f.random(-0.2, 0.2),
        ..tone(f.random(220.0, 260.0), f.random(200.0, 240.0), 1.2, Waveform::Triangle, [0.25, 0.4, 0.5, 0.45], 0.06)
    };
    vec![f.chirp(hum), f.chirp(pad)]
}

fn love(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let coo = ChirpParams {
        pan: f.random(-0.3, 0.3),
        ..tone(f.random(440.0, 520.0), f.random(660.0, 760.0), 0.4, Waveform::Sine, [0.02, 0.12, 0.55, 0.2], 0.11)
    };
    let answer = ChirpParams {
        offset: 0.32,
        vibrato: Some(Vibrato::new(7.0, 5.0)),
        pan: f.random(-0.4, 0.4),
        ..tone(f.random(520.0, 580.0), f.random(780.0, 880.0), 0.45, Waveform::Triangle, [0.015, 0.12, 0.5, 0.2], 0.12)
    };
    vec![f.chirp(coo), f.chirp(answer)]
}

fn excited(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let flutters = f.random_count(3, 4);
    let mut handles = Vec::with_capacity(flutters);
    for i in 0..flutters {
        let start = f.random(520.0, 640.0);
        let params = ChirpParams {
            offset: i as f32 * 0.16,
            vibrato: Some(Vibrato::new(12.0, 10.0)),
            pan: f.random(-0.65, 0.65),
            ..tone(start, start * f.random(1.7, 1.9), 0.28, Waveform::Sine, [0.012, 0.06, 0.4, 0.14], 0.13)
        };
        handles.push(f.chirp(params));
    }
    handles
}

fn confused(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let query = ChirpParams {
        vibrato: Some(Vibrato::new(9.0, 12.0)),
        pan: f.random(-0.4, 0.4),
        ..tone(f.random(320.0, 380.0), f.random(380.0, 420.0), 0.5, Waveform::Sine, [0.02, 0.1, 0.55, 0.2], 0.09)
    };
    let doubt = ChirpParams {
        offset: 0.32,
        vibrato: Some(Vibrato::new(5.0, 8.0)),
        pan: f.random(-0.35, 0.35),
        ..tone(f.random(420.0, 470.0), f.random(250.0, 300.0), 0.5, Waveform::Triangle, [0.018, 0.09, 0.5, 0.2], 0.085)
    };
    vec![f.chirp(query), f.chirp(doubt)]
}

fn surprised(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let gasp = NoiseParams {
        duration: 0.22,
        volume: 0.07,
        attack: 0.01,
        release: 0.15,
        offset: 0.0,
        pan: f.random(-0.2, 0.2),
    };
    let whoop = ChirpParams {
        offset: 0.1,
        pan: f.random(-0.45, 0.45),
        ..tone(f.random(480.0, 540.0), f.random(820.0, 940.0), 0.32, Waveform::Sine, [0.01, 0.08, 0.4, 0.16], 0.12)
    };
    vec![f.noise_burst(gasp), f.chirp(whoop)]
}

fn annoyed(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let pulses = f.random_count(2, 3);
    let mut handles = Vec::with_capacity(pulses);
    for i in 0..pulses {
        let grumble = ChirpParams {
            offset: i as f32 * 0.22,
            vibrato: Some(Vibrato::new(10.0, 6.0)),
            pan: f.random(-0.5, 0.5),
            ..tone(f.random(360.0, 420.0), f.random(340.0, 380.0), 0.3, Waveform::Square, [0.015, 0.08, 0.35, 0.16], 0.11)
        };
        handles.push(f.chirp(grumble));
    }
    handles
}

fn shy(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let peep = ChirpParams {
        vibrato: Some(Vibrato::new(5.0, 5.0)),
        pan: f.random(-0.25, 0.25),
        ..tone(f.random(360.0, 420.0), f.random(460.0, 510.0), 0.5, Waveform::Sine, [0.05, 0.18, 0.5, 0.28], 0.07)
    };
    vec![f.chirp(peep)]
}

fn proud(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let step = ChirpParams {
        pan: f.random(-0.3, 0.3),
        ..tone(f.random(420.0, 480.0), f.random(510.0, 560.0), 0.32, Waveform::Triangle, [0.02, 0.1, 0.55, 0.2], 0.1)
    };
    let fanfare = ChirpParams {
        offset: 0.26,
        vibrato: Some(Vibrato::new(6.0, 6.0)),
        pan: f.random(-0.35, 0.35),
        ..tone(f.random(560.0, 620.0), f.random(780.0, 840.0), 0.35, Waveform::Sine, [0.015, 0.11, 0.5, 0.2], 0.12)
    };
    vec![f.chirp(step), f.chirp(fanfare)]
}

fn silly(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let mut handles = Vec::with_capacity(3);
    for i in 0..3 {
        let start = f.random(360.0, 540.0);
        let end = (start * f.random(0.6, 1.8)).clamp(120.0, 1100.0);
        let wave = if i % 2 == 0 {
            Waveform::Triangle
        } else {
            Waveform::Sine
        };
        let hop = ChirpParams {
            offset: i as f32 * f.random(0.16, 0.22),
            vibrato: Some(Vibrato::new(f.random(8.0, 12.0), 8.0)),
            pan: f.random(-0.7, 0.7),
            ..tone(start, end, f.random(0.24, 0.32), wave, [0.015, 0.08, 0.45, 0.16], 0.11)
        };
        handles.push(f.chirp(hop));
    }
    handles
}

fn determined(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let mut handles = Vec::with_capacity(3);
    for i in 0..3 {
        let pulse = ChirpParams {
            offset: i as f32 * 0.24,
            vibrato: Some(Vibrato::new(7.0, 4.0)),
            pan: f.random(-0.3, 0.3),
            ..tone(f.random(320.0, 360.0), f.random(360.0, 400.0), 0.32, Waveform::Triangle, [0.02, 0.1, 0.55, 0.18], 0.11)
        };
        handles.push(f.chirp(pulse));
    }
    handles
}

fn worried(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let whimper = ChirpParams {
        vibrato: Some(Vibrato::new(8.0, 10.0)),
        pan: f.random(-0.4, 0.4),
        ..tone(f.random(320.0, 360.0), f.random(260.0, 300.0), 0.5, Waveform::Sine, [0.03, 0.1, 0.5, 0.25], 0.09)
    };
    let echo = ChirpParams {
        offset: 0.34,
        vibrato: Some(Vibrato::new(9.0, 7.0)),
        pan: f.random(-0.35, 0.35),
        ..tone(f.random(280.0, 320.0), f.random(240.0, 280.0), 0.4, Waveform::Triangle, [0.02, 0.09, 0.5, 0.2], 0.085)
    };
    vec![f.chirp(whimper), f.chirp(echo)]
}

fn playful(f: &mut VoiceFactory<'_>) -> Vec<VoiceHandle> {
    let mut handles = Vec::with_capacity(4);
    for i in 0..3 {
        let bounce = ChirpParams {
            offset: i as f32 * 0.2,
            vibrato: Some(Vibrato::new(10.0, 7.0)),
            pan: f.random(-0.6, 0.6),
            ..tone(f.random(420.0, 520.0), f.random(580.0, 720.0), 0.28, Waveform::Sine, [0.015, 0.08, 0.45, 0.16], 0.12)
        };
        handles.push(f.chirp(bounce));
    }
    let tail = ChirpParams {
        offset: 0.48,
        pan: f.random(-0.4, 0.4),
        ..tone(f.random(620.0, 680.0), f.random(480.0, 540.0), 0.3, Waveform::Triangle, [0.02, 0.08, 0.5, 0.18], 0.11)
    };
    handles.push(f.chirp(tail));
    handles
}
