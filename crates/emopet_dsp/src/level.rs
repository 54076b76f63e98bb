//! Input Level Meter
//!
//! Turns raw microphone samples into a single smoothed loudness value in
//! [0, 1] that drives the pet's eye size.
//!
//! # Algorithm
//!
//! Every update takes the most recent [`LEVEL_FFT_SIZE`] samples and:
//! 1. applies a Blackman window and a forward FFT
//! 2. smooths each bin magnitude over time (`0.8·old + 0.2·new`)
//! 3. maps each bin's dB value from [-100, -30] onto a byte (0-255)
//! 4. averages the bytes, divides by 128 and clamps to 1
//! 5. smooths the result again: `level = 0.8·level + 0.2·new`

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Analysis window length (128 frequency bins)
pub const LEVEL_FFT_SIZE: usize = 256;

const BINS: usize = LEVEL_FFT_SIZE / 2;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;
/// Per-bin smoothing between analysis frames
const SPECTRAL_SMOOTHING: f32 = 0.8;
/// Smoothing of the final level between updates
pub const LEVEL_SMOOTHING: f32 = 0.8;

fn blackman(n: usize, size: usize) -> f32 {
    let x = 2.0 * PI * n as f32 / size as f32;
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}

/// Map a linear bin magnitude onto the 0-255 byte scale
#[inline]
fn magnitude_to_byte(magnitude: f32) -> f32 {
    if magnitude <= 0.0 {
        return 0.0;
    }
    let db = 20.0 * magnitude.log10();
    (255.0 / (MAX_DB - MIN_DB) * (db - MIN_DB)).clamp(0.0, 255.0).floor()
}

/// FFT-based loudness estimator
pub struct LevelMeter {
    ring: [f32; LEVEL_FFT_SIZE],
    write_pos: usize,
    window: [f32; LEVEL_FFT_SIZE],
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    bins: [f32; BINS],
    level: f32,
}

impl LevelMeter {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(LEVEL_FFT_SIZE);

        Self {
            ring: [0.0; LEVEL_FFT_SIZE],
            write_pos: 0,
            window: core::array::from_fn(|i| blackman(i, LEVEL_FFT_SIZE)),
            fft,
            scratch: vec![Complex::new(0.0, 0.0); LEVEL_FFT_SIZE],
            bins: [0.0; BINS],
            level: 0.0,
        }
    }

    /// Feed interleaved samples; channels are averaged down to mono
    pub fn push_samples(&mut self, samples: &[f32], channels: usize) {
        let channels = channels.max(1);
        for frame in samples.chunks(channels) {
            let mono = frame.iter().sum::<f32>() / frame.len() as f32;
            self.ring[self.write_pos] = mono;
            self.write_pos = (self.write_pos + 1) % LEVEL_FFT_SIZE;
        }
    }

    /// Run one analysis frame and return the new smoothed level
    pub fn update(&mut self) -> f32 {
        for i in 0..LEVEL_FFT_SIZE {
            // Oldest sample first
            let sample = self.ring[(self.write_pos + i) % LEVEL_FFT_SIZE];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / LEVEL_FFT_SIZE as f32;
        let mut total = 0.0;
        for (bin, value) in self.bins.iter_mut().zip(&self.scratch) {
            let magnitude = value.norm() * scale;
            *bin = SPECTRAL_SMOOTHING * *bin + (1.0 - SPECTRAL_SMOOTHING) * magnitude;
            total += magnitude_to_byte(*bin);
        }

        let average = total / BINS as f32;
        let normalized = (average / 128.0).min(1.0);
        self.level = self.level * LEVEL_SMOOTHING + normalized * (1.0 - LEVEL_SMOOTHING);
        self.level
    }

    /// Last computed level
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.ring = [0.0; LEVEL_FFT_SIZE];
        self.bins = [0.0; BINS];
        self.write_pos = 0;
        self.level = 0.0;
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn noise(len: usize, amplitude: f32, seed: u64) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len)
            .map(|_| rng.gen_range(-amplitude..amplitude))
            .collect()
    }

    #[test]
    fn test_silence_is_zero() {
        let mut meter = LevelMeter::new();
        meter.push_samples(&[0.0; 512], 1);
        assert_eq!(meter.update(), 0.0);
    }

    #[test]
    fn test_byte_mapping_bounds() {
        assert_eq!(magnitude_to_byte(0.0), 0.0);
        // -100 dB and below
        assert_eq!(magnitude_to_byte(1e-6), 0.0);
        // -30 dB and above
        assert_eq!(magnitude_to_byte(0.1), 255.0);
        // -65 dB sits in the middle
        let mid = magnitude_to_byte(10.0_f32.powf(-65.0 / 20.0));
        assert!((mid - 127.0).abs() <= 1.0);
    }

    #[test]
    fn test_loud_input_raises_level_smoothly() {
        let mut meter = LevelMeter::new();
        meter.push_samples(&noise(LEVEL_FFT_SIZE, 1.0, 7), 1);

        let first = meter.update();
        assert!(first > 0.0 && first <= 0.2 + 1e-6, "first update {}", first);

        let mut last = first;
        for seed in 8..40 {
            meter.push_samples(&noise(LEVEL_FFT_SIZE, 1.0, seed), 1);
            let level = meter.update();
            assert!(level >= last - 1e-6);
            last = level;
        }
        assert!(last > 0.9 && last <= 1.0, "settled at {}", last);
    }

    #[test]
    fn test_level_decays_after_input_stops() {
        let mut meter = LevelMeter::new();
        for seed in 0..20 {
            meter.push_samples(&noise(LEVEL_FFT_SIZE, 1.0, seed), 1);
            meter.update();
        }
        let loud = meter.level();

        // Both smoothing stages have to drain before the level falls
        let mut quieter = loud;
        for _ in 0..40 {
            meter.push_samples(&[0.0; LEVEL_FFT_SIZE], 1);
            quieter = meter.update();
        }
        assert!(quieter < loud * 0.5, "{} vs {}", quieter, loud);
    }

    #[test]
    fn test_stereo_is_mixed_down() {
        let mut meter = LevelMeter::new();
        // Opposite-phase channels cancel to silence
        let samples: Vec<f32> = (0..LEVEL_FFT_SIZE * 2)
            .map(|i| if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();
        meter.push_samples(&samples, 2);
        assert_eq!(meter.update(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut meter = LevelMeter::new();
        meter.push_samples(&noise(LEVEL_FFT_SIZE, 1.0, 1), 1);
        meter.update();
        meter.reset();
        assert_eq!(meter.level(), 0.0);
    }
}
