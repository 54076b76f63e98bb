//! Sound Engine
//!
//! Owns the one audio output of the process and plays the active emotion as
//! a self-rescheduling series of bursts.
//!
//! ```text
//! unlock() ──▶ OutputFactory ──▶ Box<dyn AudioOutput> (resumed)
//! play(e)  ──▶ stop voices, clear loop ──▶ burst ──▶ schedule loop timer
//! advance() ─▶ expire voices ──▶ due loop timer? ──▶ burst ──▶ reschedule
//! ```
//!
//! Nothing runs on its own: the host calls [`SoundEngine::advance`] from its
//! frame loop. Loop timers carry the emotion that armed them, and a timer
//! firing for an emotion that is no longer active does nothing.
//!
//! None of the public operations return errors. Failures are logged and
//! leave the engine silent.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, trace, warn};

use emopet_dsp::{MixerCommand, NoiseCache};

use super::preset::{sound_presets, EmotionSoundPreset};
use super::scheduler::{TimerId, TimerQueue};
use super::voices::{VoiceFactory, VoiceHandle, VoiceRegistry};
use crate::clock::Clock;
use crate::config::SoundConfig;
use crate::emotion::{Emotion, EmotionTable};
use crate::output::{AudioOutput, OutputFactory, OutputState};

/// Burst length assumed when a preset produced no voices
const DEFAULT_BURST_SECS: f32 = 1.0;

/// Payload of a pending loop timer
#[derive(Debug, Clone, Copy)]
struct LoopTimer {
    emotion: Emotion,
    /// Lifetime to reuse if the next burst comes out empty
    fallback: f32,
}

/// Procedural voice of the pet
pub struct SoundEngine {
    config: SoundConfig,
    presets: EmotionTable<EmotionSoundPreset>,
    factory: OutputFactory,
    clock: Arc<dyn Clock>,
    output: Option<Box<dyn AudioOutput>>,
    unlocked: bool,
    muted: bool,
    active: Option<Emotion>,
    voices: VoiceRegistry,
    timers: TimerQueue<LoopTimer>,
    loop_timer: Option<TimerId>,
    noise: NoiseCache,
    rng: StdRng,
    master_target: f32,
}

impl SoundEngine {
    /// Create an engine with the built-in presets; no output is opened yet
    pub fn new(config: SoundConfig, factory: OutputFactory, clock: Arc<dyn Clock>) -> Self {
        Self::with_presets(config, factory, clock, sound_presets())
    }

    pub fn with_presets(
        config: SoundConfig,
        factory: OutputFactory,
        clock: Arc<dyn Clock>,
        presets: EmotionTable<EmotionSoundPreset>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            muted: config.muted,
            master_target: config.master_gain,
            config,
            presets,
            factory,
            clock,
            output: None,
            unlocked: false,
            active: None,
            voices: VoiceRegistry::new(),
            timers: TimerQueue::new(),
            loop_timer: None,
            noise: NoiseCache::new(),
            rng,
        }
    }

    /// Open the output if needed and make sure it is running
    ///
    /// Call after the first user gesture. Returns whether the engine can now
    /// play; failures are logged and leave it not ready.
    pub fn unlock(&mut self) -> bool {
        if self.output.is_none() {
            match (self.factory)() {
                Ok(output) => {
                    info!(
                        "Audio output created: {} Hz, {:?}",
                        output.sample_rate(),
                        output.state()
                    );
                    self.output = Some(output);
                }
                Err(e) => {
                    warn!("Audio output unavailable: {}", e);
                    return false;
                }
            }
        }

        let Some(output) = self.output.as_deref_mut() else {
            return false;
        };
        if output.state() != OutputState::Running {
            if let Err(e) = output.resume() {
                warn!("Failed to resume audio output: {}", e);
                return false;
            }
        }

        self.unlocked = true;
        info!("Sound engine unlocked");
        true
    }

    /// Whether `play` will actually produce sound
    pub fn is_ready(&self) -> bool {
        self.unlocked
            && self
                .output
                .as_ref()
                .is_some_and(|o| o.state() == OutputState::Running)
    }

    /// Start looping `emotion`
    ///
    /// Dropped silently before a successful unlock or while muted. Playing
    /// the emotion that is already looping changes nothing.
    pub fn play(&mut self, emotion: Emotion) {
        if !self.unlocked || self.muted {
            trace!("Dropping play({}) - engine not ready", emotion);
            return;
        }
        if self.active == Some(emotion) && self.loop_timer.is_some() {
            return;
        }

        self.stop_voices();
        self.clear_loop();
        self.active = Some(emotion);
        info!("Playing {}", emotion);

        let lifetime = self.trigger(emotion).unwrap_or(DEFAULT_BURST_SECS);
        self.schedule_next(emotion, lifetime);
    }

    /// Silence everything and forget the active emotion
    pub fn stop(&mut self) {
        let was = self.active.take();
        self.clear_loop();
        self.stop_voices();
        if let Some(emotion) = was {
            info!("Stopped {}", emotion);
        }
    }

    /// Expire finished voices and fire due loop timers
    pub fn advance(&mut self) {
        let now = self.clock.now();
        let expired = self.voices.expire(now);
        if expired > 0 {
            trace!("Expired {} voices, {} live", expired, self.voices.len());
        }

        while let Some((id, timer)) = self.timers.pop_due(now) {
            if self.loop_timer == Some(id) {
                self.loop_timer = None;
            }
            if self.active != Some(timer.emotion) {
                debug!("Ignoring stale loop timer for {}", timer.emotion);
                continue;
            }
            let lifetime = self.trigger(timer.emotion).unwrap_or(timer.fallback);
            self.schedule_next(timer.emotion, lifetime);
        }
    }

    /// Mute drops further `play` calls and stops what is playing
    pub fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        if muted {
            self.stop();
        }
        info!("Sound {}", if muted { "muted" } else { "unmuted" });
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Stop everything and release the output; a later unlock reopens it
    pub fn shutdown(&mut self) {
        self.stop();
        if let Some(mut output) = self.output.take() {
            output.close();
            info!("Sound engine shut down");
        }
        self.unlocked = false;
    }

    pub fn active_emotion(&self) -> Option<Emotion> {
        self.active
    }

    /// Number of registered voices that have not expired
    pub fn live_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn voice_handles(&self) -> impl Iterator<Item = &VoiceHandle> {
        self.voices.handles()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Engine time of the next loop burst
    pub fn next_burst_at(&self) -> Option<f64> {
        self.loop_timer.and_then(|id| self.timers.deadline(id))
    }

    /// Master gain the output is gliding towards
    pub fn master_gain_target(&self) -> f32 {
        self.master_target
    }

    /// Play one burst of `emotion`; returns the longest voice lifetime
    fn trigger(&mut self, emotion: Emotion) -> Option<f32> {
        let preset = *self.presets.get(emotion);
        let output = self.output.as_deref_mut()?;

        if let Some(gain) = preset.base_gain {
            let command = MixerCommand::SetMasterTarget {
                target: gain,
                time_constant: self.config.gain_time_constant,
            };
            match output.submit(command) {
                Ok(()) => self.master_target = gain,
                Err(e) => warn!("Failed to set master gain: {}", e),
            }
        }

        let now = self.clock.now();
        let mut factory = VoiceFactory::new(output, &mut self.rng, &mut self.noise);
        let handles = (preset.voices)(&mut factory);
        let longest = handles.iter().map(VoiceHandle::lifetime).fold(0.0, f32::max);

        debug!(
            "Burst for {}: {} voices, longest {:.2}s",
            emotion,
            handles.len(),
            longest
        );
        let grace = f64::from(self.config.cleanup_grace);
        for handle in handles {
            self.voices.register(handle, now, grace);
        }

        (longest > 0.0).then_some(longest)
    }

    fn schedule_next(&mut self, emotion: Emotion, fallback: f32) {
        let Some(interval) = self.presets.get(emotion).loop_interval else {
            return;
        };
        let delay_ms = interval.resolve(&mut self.rng, fallback);
        let deadline = self.clock.now() + delay_ms as f64 / 1000.0;
        self.loop_timer = Some(self.timers.schedule(deadline, LoopTimer { emotion, fallback }));
        trace!("Next {} burst in {}ms", emotion, delay_ms);
    }

    fn clear_loop(&mut self) {
        self.timers.clear();
        self.loop_timer = None;
    }

    fn stop_voices(&mut self) {
        let Some(output) = self.output.as_deref_mut() else {
            self.voices.clear();
            return;
        };
        self.voices.stop_all(output);
        // Voices this engine no longer tracks may still be in the mixer
        if let Err(e) = output.submit(MixerCommand::StopAll) {
            warn!("Failed to release voices: {}", e);
        }
    }
}

impl Drop for SoundEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::output::{unavailable, OfflineOutput};

    fn config() -> SoundConfig {
        SoundConfig {
            seed: Some(7),
            ..Default::default()
        }
    }

    fn engine(output: &OfflineOutput, clock: &ManualClock) -> SoundEngine {
        SoundEngine::new(config(), output.factory(), Arc::new(clock.clone()))
    }

    fn parts() -> (OfflineOutput, ManualClock) {
        (OfflineOutput::new(48000, 0.22).unwrap(), ManualClock::new())
    }

    #[test]
    fn test_unlock_then_happy_burst() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        assert!(!sound.is_ready());

        assert!(sound.unlock());
        assert!(sound.is_ready());

        sound.play(Emotion::Happy);
        assert_eq!(sound.active_emotion(), Some(Emotion::Happy));
        assert!(sound.live_voices() >= 2);
        for handle in sound.voice_handles() {
            assert!((0.3..=0.4).contains(&handle.lifetime()));
        }
        assert_eq!(output.active_voices(), sound.live_voices());

        let next = sound.next_burst_at().unwrap();
        assert!((2.4..=3.2).contains(&next), "next burst at {next}");
        assert_eq!(sound.pending_timers(), 1);
    }

    #[test]
    fn test_play_before_unlock_is_dropped() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);

        sound.play(Emotion::Happy);
        assert_eq!(sound.active_emotion(), None);
        assert_eq!(sound.live_voices(), 0);
        assert_eq!(sound.pending_timers(), 0);
        assert_eq!(output.active_voices(), 0);

        assert!(sound.unlock());
        sound.play(Emotion::Happy);
        assert!(sound.live_voices() >= 2);
    }

    #[test]
    fn test_unlock_without_output() {
        let clock = ManualClock::new();
        let mut sound = SoundEngine::new(config(), unavailable(), Arc::new(clock));
        assert!(!sound.unlock());
        assert!(!sound.is_ready());

        sound.play(Emotion::Angry);
        assert_eq!(sound.active_emotion(), None);
        assert_eq!(sound.live_voices(), 0);
    }

    #[test]
    fn test_unlock_resume_rejected() {
        let output = OfflineOutput::failing_resume(48000, 0.22).unwrap();
        let clock = ManualClock::new();
        let mut sound = engine(&output, &clock);
        assert!(!sound.unlock());
        assert!(!sound.is_ready());

        sound.play(Emotion::Calm);
        assert_eq!(output.active_voices(), 0);
    }

    #[test]
    fn test_switching_emotion_replaces_voices() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        sound.play(Emotion::Angry);
        let angry: Vec<_> = sound.voice_handles().map(VoiceHandle::id).collect();
        assert!(!angry.is_empty());

        clock.advance(0.05);
        output.render(2400);
        sound.advance();
        sound.play(Emotion::Calm);

        assert_eq!(sound.active_emotion(), Some(Emotion::Calm));
        assert_eq!(sound.pending_timers(), 1);
        assert_eq!(sound.live_voices(), 2);
        for id in &angry {
            assert!(sound.voice_handles().all(|h| h.id() != *id));
        }

        // Released voices fade and leave the mixer within 90 ms
        output.render(4800);
        for id in &angry {
            assert!(!output.has_voice(*id));
        }
    }

    #[test]
    fn test_play_same_emotion_is_idempotent() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        sound.play(Emotion::Happy);
        let ids: Vec<_> = sound.voice_handles().map(VoiceHandle::id).collect();
        let next = sound.next_burst_at();

        clock.advance(0.2);
        sound.advance();
        sound.play(Emotion::Happy);

        let again: Vec<_> = sound.voice_handles().map(VoiceHandle::id).collect();
        assert_eq!(ids, again);
        assert_eq!(sound.next_burst_at(), next);
        assert_eq!(sound.pending_timers(), 1);
        assert_eq!(output.active_voices(), ids.len());
    }

    #[test]
    fn test_voices_expire_without_stop() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        // One 0.9 s voice, next burst no earlier than 5.2 s
        sound.play(Emotion::Sad);
        assert_eq!(sound.live_voices(), 1);

        clock.set(1.1);
        sound.advance();
        assert_eq!(sound.live_voices(), 1);

        clock.set(0.9 + 0.3);
        sound.advance();
        assert_eq!(sound.live_voices(), 0);
        assert_eq!(sound.active_emotion(), Some(Emotion::Sad));
        assert_eq!(sound.pending_timers(), 1);
    }

    #[test]
    fn test_loop_refires() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        // Calm loops every 0.9 - 1.2 s with two long voices
        sound.play(Emotion::Calm);
        let first = sound.next_burst_at().unwrap();
        assert!((0.9..=1.2).contains(&first));

        clock.set(1.25);
        sound.advance();
        assert_eq!(sound.live_voices(), 4);
        assert_eq!(sound.pending_timers(), 1);
        let second = sound.next_burst_at().unwrap();
        assert!((1.25 + 0.9..=1.25 + 1.2).contains(&second));
    }

    #[test]
    fn test_stop_clears_everything() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        sound.play(Emotion::Scared);
        sound.stop();
        assert_eq!(sound.active_emotion(), None);
        assert_eq!(sound.live_voices(), 0);
        assert_eq!(sound.pending_timers(), 0);
        assert_eq!(sound.next_burst_at(), None);

        // Safe to repeat, and no burst fires later
        sound.stop();
        clock.set(10.0);
        sound.advance();
        assert_eq!(sound.live_voices(), 0);

        output.render(4800);
        assert_eq!(output.active_voices(), 0);
    }

    #[test]
    fn test_stop_silences_delayed_voice() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        // The second neutral chirp starts at 0.38 s and runs until 0.78 s
        sound.play(Emotion::Neutral);
        let ids: Vec<_> = sound.voice_handles().map(VoiceHandle::id).collect();
        assert_eq!(ids.len(), 2);

        clock.set(0.7);
        output.render(33600);
        sound.advance();
        // Its handle is gone but the mixer is still playing it
        assert!(output.has_voice(ids[1]));
        assert!(sound.voice_handles().all(|h| h.id() != ids[1]));

        sound.stop();
        output.render(4800);
        assert_eq!(output.active_voices(), 0);
    }

    #[test]
    fn test_switching_silences_delayed_voice() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();

        sound.play(Emotion::Neutral);
        let neutral: Vec<_> = sound.voice_handles().map(VoiceHandle::id).collect();

        clock.set(0.7);
        output.render(33600);
        sound.advance();

        sound.play(Emotion::Sad);
        output.render(4800);
        for id in &neutral {
            assert!(!output.has_voice(*id));
        }
    }

    #[test]
    fn test_master_gain_glides_to_preset() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();
        assert_eq!(sound.master_gain_target(), 0.22);

        sound.play(Emotion::Angry);
        assert_eq!(sound.master_gain_target(), 0.28);

        // Not a jump: shortly after the change the gain is still in between
        output.render(4800);
        let early = output.master_gain();
        assert!(early > 0.22 && early < 0.27);

        output.render(96000);
        assert!((output.master_gain() - 0.28).abs() < 0.005);
    }

    #[test]
    fn test_missing_preset_uses_neutral() {
        let (output, clock) = parts();
        let presets = EmotionTable::partial(
            EmotionSoundPreset::builtin(Emotion::Neutral),
            [(Emotion::Sad, EmotionSoundPreset::builtin(Emotion::Sad))],
        );
        let mut sound =
            SoundEngine::with_presets(config(), output.factory(), Arc::new(clock.clone()), presets);
        sound.unlock();

        sound.play(Emotion::Happy);
        let lifetimes: Vec<f32> = sound.voice_handles().map(VoiceHandle::lifetime).collect();
        assert_eq!(lifetimes, vec![0.6, 0.4]);
        assert_eq!(sound.master_gain_target(), 0.18);
        let next = sound.next_burst_at().unwrap();
        assert!((4.2..=5.8).contains(&next));
    }

    #[test]
    fn test_mute_drops_play() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();
        sound.play(Emotion::Love);

        sound.set_muted(true);
        assert!(sound.is_muted());
        assert_eq!(sound.active_emotion(), None);
        sound.play(Emotion::Happy);
        assert_eq!(sound.live_voices(), 0);

        sound.set_muted(false);
        sound.play(Emotion::Happy);
        assert!(sound.live_voices() >= 2);
    }

    #[test]
    fn test_shutdown_closes_output() {
        let (output, clock) = parts();
        let mut sound = engine(&output, &clock);
        sound.unlock();
        sound.play(Emotion::Playful);

        sound.shutdown();
        assert!(!sound.is_ready());
        assert_eq!(output.state(), OutputState::Closed);
        sound.play(Emotion::Happy);
        assert_eq!(sound.live_voices(), 0);
    }
}
