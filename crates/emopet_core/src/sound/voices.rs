//! Voice creation and bookkeeping
//!
//! Presets build voices through a [`VoiceFactory`], which stamps them with
//! absolute start times on the output clock and hands them to the mixer.
//! The engine keeps the returned [`VoiceHandle`]s in a [`VoiceRegistry`]
//! until they expire or are stopped.

use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

use emopet_dsp::{ChirpParams, MixerCommand, NoiseCache, NoiseParams, Voice, VoiceId};

use crate::output::AudioOutput;

/// A voice handed to the mixer
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceHandle {
    id: VoiceId,
    lifetime: f32,
    stopped: bool,
}

impl VoiceHandle {
    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Nominal duration in seconds
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    /// Fade the voice out quickly; later calls do nothing
    pub fn stop(&mut self, output: &mut dyn AudioOutput) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        if let Err(e) = output.submit(MixerCommand::Release(self.id)) {
            warn!("Failed to release voice {}: {}", self.id.get(), e);
        }
    }
}

/// Builds voices against one output for the duration of a burst
pub struct VoiceFactory<'a> {
    output: &'a mut dyn AudioOutput,
    rng: &'a mut StdRng,
    noise: &'a mut NoiseCache,
}

impl<'a> VoiceFactory<'a> {
    pub fn new(
        output: &'a mut dyn AudioOutput,
        rng: &'a mut StdRng,
        noise: &'a mut NoiseCache,
    ) -> Self {
        Self { output, rng, noise }
    }

    /// Uniform value in `[min, max)`
    pub fn random(&mut self, min: f32, max: f32) -> f32 {
        if max > min {
            self.rng.gen_range(min..max)
        } else {
            min
        }
    }

    /// Uniform integer in `[min, max]`
    pub fn random_count(&mut self, min: usize, max: usize) -> usize {
        self.rng.gen_range(min..=max.max(min))
    }

    /// Schedule a swept tone
    pub fn chirp(&mut self, params: ChirpParams) -> VoiceHandle {
        let now = self.output.current_time();
        let voice = Voice::chirp(VoiceId::next(), &params, now);
        self.submit(voice)
    }

    /// Schedule a white-noise burst
    pub fn noise_burst(&mut self, params: NoiseParams) -> VoiceHandle {
        let now = self.output.current_time();
        let buffer = self.noise.get(self.output.sample_rate(), &mut *self.rng);
        let voice = Voice::noise(VoiceId::next(), &params, now, buffer);
        self.submit(voice)
    }

    fn submit(&mut self, voice: Voice) -> VoiceHandle {
        let handle = VoiceHandle {
            id: voice.id(),
            lifetime: voice.lifetime(),
            stopped: false,
        };
        if let Err(e) = self.output.submit(MixerCommand::Start(Box::new(voice))) {
            warn!("Failed to start voice {}: {}", handle.id.get(), e);
        }
        handle
    }
}

/// Live voice handles with their cleanup deadlines
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    entries: Vec<(VoiceHandle, f64)>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle` until `now + lifetime + grace`
    ///
    /// A voice with a start offset can outlast its handle, so callers that
    /// silence the engine also release the mixer as a whole.
    pub fn register(&mut self, handle: VoiceHandle, now: f64, grace: f64) {
        let deadline = now + f64::from(handle.lifetime) + grace;
        self.entries.push((handle, deadline));
    }

    /// Drop handles whose deadline has passed; returns how many went
    pub fn expire(&mut self, now: f64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(_, deadline)| *deadline > now);
        before - self.entries.len()
    }

    /// Stop and forget every handle
    pub fn stop_all(&mut self, output: &mut dyn AudioOutput) {
        for (handle, _) in &mut self.entries {
            handle.stop(output);
        }
        self.entries.clear();
    }

    /// Forget every handle without touching the mixer
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: VoiceId) -> bool {
        self.entries.iter().any(|(h, _)| h.id == id)
    }

    pub fn handles(&self) -> impl Iterator<Item = &VoiceHandle> {
        self.entries.iter().map(|(h, _)| h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OfflineOutput;
    use rand::SeedableRng;

    fn parts() -> (OfflineOutput, StdRng, NoiseCache) {
        let output = OfflineOutput::new(48000, 0.22).unwrap();
        (output, StdRng::seed_from_u64(1), NoiseCache::new())
    }

    #[test]
    fn test_factory_submits_voices() {
        let (output, mut rng, mut noise) = parts();
        let mut engine_side = output.clone();
        let mut factory = VoiceFactory::new(&mut engine_side, &mut rng, &mut noise);

        let chirp = factory.chirp(ChirpParams {
            start_freq: 400.0,
            duration: 0.35,
            ..Default::default()
        });
        let burst = factory.noise_burst(NoiseParams {
            duration: 0.18,
            ..Default::default()
        });

        assert_eq!(chirp.lifetime(), 0.35);
        assert_eq!(burst.lifetime(), 0.18);
        assert_ne!(chirp.id(), burst.id());
        assert!(output.has_voice(chirp.id()));
        assert!(output.has_voice(burst.id()));
        assert_eq!(noise.cached_rate(), Some(48000));
    }

    #[test]
    fn test_random_helpers_stay_in_range() {
        let (mut output, mut rng, mut noise) = parts();
        let mut factory = VoiceFactory::new(&mut output, &mut rng, &mut noise);
        for _ in 0..200 {
            let v = factory.random(0.18, 0.26);
            assert!((0.18..0.26).contains(&v));
            let n = factory.random_count(2, 3);
            assert!(n == 2 || n == 3);
        }
        assert_eq!(factory.random(1.0, 1.0), 1.0);
    }

    #[test]
    fn test_registry_expiry() {
        let handle = |lifetime| VoiceHandle {
            id: VoiceId::next(),
            lifetime,
            stopped: false,
        };
        let mut registry = VoiceRegistry::new();
        registry.register(handle(0.35), 10.0, 0.25);
        registry.register(handle(0.9), 10.0, 0.25);

        assert_eq!(registry.expire(10.5), 0);
        assert_eq!(registry.expire(10.65), 1);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.expire(11.2), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (output, mut rng, mut noise) = parts();
        let mut engine_side = output.clone();
        engine_side.resume().unwrap();
        let mut handle = VoiceFactory::new(&mut engine_side, &mut rng, &mut noise).chirp(
            ChirpParams {
                start_freq: 300.0,
                duration: 1.0,
                ..Default::default()
            },
        );

        handle.stop(&mut engine_side);
        handle.stop(&mut engine_side);
        // Fade is 80 ms and the hard stop 90 ms after release
        output.render(4800);
        assert!(!output.has_voice(handle.id()));
    }

    #[test]
    fn test_stop_all_clears() {
        let (output, mut rng, mut noise) = parts();
        let mut engine_side = output.clone();
        let mut registry = VoiceRegistry::new();
        {
            let mut factory = VoiceFactory::new(&mut engine_side, &mut rng, &mut noise);
            for _ in 0..3 {
                let h = factory.chirp(ChirpParams {
                    start_freq: 500.0,
                    duration: 0.3,
                    ..Default::default()
                });
                registry.register(h, 0.0, 0.25);
            }
        }
        assert_eq!(registry.len(), 3);
        registry.stop_all(&mut engine_side);
        assert!(registry.is_empty());
    }
}
