//! Band-unlimited oscillators
//!
//! Voices are short (well under a second) and quiet, so naive waveforms are
//! good enough; aliasing on the square wave is part of the "angry" timbre.

use std::f64::consts::TAU;

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    #[default]
    Sine,
    Square,
    Triangle,
    Sawtooth,
}

impl Waveform {
    /// Sample the waveform at a normalized phase in [0, 1)
    #[inline]
    pub fn sample(self, phase: f64) -> f32 {
        match self {
            Waveform::Sine => (phase * TAU).sin() as f32,
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Triangle => (1.0 - 4.0 * (phase - 0.5).abs()) as f32,
            Waveform::Sawtooth => (2.0 * phase - 1.0) as f32,
        }
    }
}

/// Phase accumulator driving a waveform at a (possibly changing) frequency
#[derive(Debug, Clone, Copy)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform) -> Self {
        Self { waveform, phase: 0.0 }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Produce one sample and advance the phase
    ///
    /// # Real-time Safety
    /// No allocations, O(1).
    #[inline]
    pub fn next_sample(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let out = self.waveform.sample(self.phase);
        self.phase += f64::from(frequency) / f64::from(sample_rate);
        self.phase = self.phase.rem_euclid(1.0);
        out
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
