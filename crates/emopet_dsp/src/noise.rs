//! White noise source shared by noise-burst voices
//!
//! One second of noise is generated once and handed out as a shared slice.
//! It is only regenerated when the sample rate changes.

use std::sync::Arc;

use rand::Rng;

/// Lazily generated, sample-rate keyed noise buffer
#[derive(Debug, Default)]
pub struct NoiseCache {
    buffer: Option<Arc<[f32]>>,
    sample_rate: u32,
}

impl NoiseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the cached buffer for `sample_rate`, generating it if needed
    ///
    /// Note: This allocates on a cache miss. Call from the control thread.
    pub fn get<R: Rng + ?Sized>(&mut self, sample_rate: u32, rng: &mut R) -> Arc<[f32]> {
        if let Some(buffer) = &self.buffer {
            if self.sample_rate == sample_rate {
                return Arc::clone(buffer);
            }
        }

        let buffer: Arc<[f32]> = (0..sample_rate.max(1))
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();
        self.buffer = Some(Arc::clone(&buffer));
        self.sample_rate = sample_rate;
        buffer
    }

    /// Sample rate of the cached buffer, if any
    pub fn cached_rate(&self) -> Option<u32> {
        self.buffer.as_ref().map(|_| self.sample_rate)
    }
}
