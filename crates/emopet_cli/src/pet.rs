//! The pet: both engines and the microphone on one clock

use std::sync::Arc;

use tracing::{debug, info};

use emopet_core::{
    AnimationEngine, Clock, Emotion, EngineConfig, Frame, MicLevel, OutputFactory, SoundEngine,
};

use crate::command::Command;

pub struct Pet {
    animation: AnimationEngine,
    sound: SoundEngine,
    mic: MicLevel,
    clock: Arc<dyn Clock>,
    emotion: Emotion,
}

impl Pet {
    pub fn new(
        config: &EngineConfig,
        output: OutputFactory,
        clock: Arc<dyn Clock>,
        mic: MicLevel,
    ) -> Self {
        let animation = AnimationEngine::from_config(&config.animation);
        let sound = SoundEngine::new(config.sound.clone(), output, Arc::clone(&clock));
        Self {
            animation,
            sound,
            mic,
            clock,
            emotion: Emotion::Neutral,
        }
    }

    /// Open the audio output; the terminal session counts as the user gesture
    pub fn unlock(&mut self) -> bool {
        self.sound.unlock()
    }

    pub fn emotion(&self) -> Emotion {
        self.emotion
    }

    pub fn set_emotion(&mut self, emotion: Emotion) {
        self.emotion = emotion;
        self.animation.set_emotion(emotion);
        self.sound.play(emotion);
    }

    /// Milliseconds on the shared clock
    pub fn now_ms(&self) -> f64 {
        self.clock.now() * 1000.0
    }

    pub fn apply(&mut self, command: Command) {
        let now_ms = self.now_ms();
        match command {
            Command::Tap => {
                self.animation.tap(now_ms);
                self.set_emotion(self.emotion.next());
            }
            Command::Next => self.set_emotion(self.emotion.next()),
            Command::Set(emotion) => self.set_emotion(emotion),
            Command::Color(color) => self.animation.set_eye_color(color),
            Command::Stop => self.sound.stop(),
            Command::Mute(muted) => {
                self.sound.set_muted(muted);
                if !muted {
                    self.sound.play(self.emotion);
                }
            }
            Command::Quit => {}
        }
        info!("Emotion {} ({:?} eyes)", self.emotion, self.animation.eye_color());
    }

    /// Advance everything to the current clock reading and draw a frame
    pub fn frame(&mut self) -> Frame {
        let now_ms = self.now_ms();
        let level = self.mic.poll();
        self.animation.set_audio_level(level);
        self.sound.advance();
        self.animation.tick(now_ms)
    }

    pub fn sound(&self) -> &SoundEngine {
        &self.sound
    }

    pub fn shutdown(&mut self) {
        self.animation.shutdown();
        self.sound.shutdown();
        if self.mic.is_active() {
            debug!("Releasing microphone");
        }
        self.mic = MicLevel::disabled();
    }
}

/// One debug line describing a frame
pub fn log_summary(frame: &Frame, sound: &SoundEngine) {
    let (left, right) = (&frame.left, &frame.right);
    debug!(
        "t={:.0}ms {} L({:.1},{:.1} {:.1}x{:.1}) R({:.1},{:.1} {:.1}x{:.1}) tilt={:.2} blink={} voices={} next={:?}",
        frame.time_ms,
        frame.emotion,
        left.rect.x,
        left.rect.y,
        left.rect.width,
        left.rect.height,
        right.rect.x,
        right.rect.y,
        right.rect.width,
        right.rect.height,
        frame.head_tilt,
        frame.blinking,
        sound.live_voices(),
        sound.next_burst_at().map(|t| (t * 1000.0).round()),
    );
}
