//! Output Safety Clipper
//!
//! Several loud voices (the "angry" and "excited" presets stack up to four
//! chirps plus noise) can sum past full scale. The last stage of the output
//! chain bends anything above a threshold smoothly towards ±1.0 instead of
//! letting the device hard-clip.
//!
//! # Algorithm
//!
//! - Below threshold: unity gain
//! - Above threshold: `threshold + headroom · tanh(excess / headroom)`

/// Default threshold in dB below full scale
pub const DEFAULT_THRESHOLD_DB: f32 = -3.0;

/// tanh soft clipper, the final stage of the output chain
#[derive(Debug, Clone, Copy)]
pub struct SoftClipper {
    /// Linear threshold (0.0 to 1.0)
    threshold: f32,
    enabled: bool,
}

impl SoftClipper {
    /// Create a clipper that starts bending `threshold_db` below 0 dBFS
    pub fn new(threshold_db: f32) -> Self {
        Self {
            threshold: db_to_linear(threshold_db).clamp(0.0, 1.0),
            enabled: true,
        }
    }

    pub fn set_threshold_db(&mut self, db: f32) {
        self.threshold = db_to_linear(db).clamp(0.0, 1.0);
    }

    /// Current threshold in linear scale
    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[inline]
    pub fn process_sample(&self, sample: f32) -> f32 {
        if !self.enabled {
            return sample;
        }
        soft_clip(sample, self.threshold)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Clip an interleaved buffer in place
    ///
    /// # Real-time Safety
    /// No allocations. O(n) in the buffer length.
    #[inline]
    pub fn process(&self, buffer: &mut [f32]) {
        if !self.enabled {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = soft_clip(*sample, self.threshold);
        }
    }
}

impl Default for SoftClipper {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_DB)
    }
}

#[inline]
fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[inline]
fn soft_clip(sample: f32, threshold: f32) -> f32 {
    let magnitude = sample.abs();
    if magnitude <= threshold {
        return sample;
    }

    let headroom = (1.0 - threshold).max(0.001);
    let excess = magnitude - threshold;
    sample.signum() * (threshold + headroom * (excess / headroom).tanh())
}
