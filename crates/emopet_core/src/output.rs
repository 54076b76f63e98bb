//! Audio Output Abstraction
//!
//! The sound engine only ever talks to an [`AudioOutput`]: something with a
//! clock, a suspended/running state and a way to hand voices to a mixer.
//! [`DeviceOutput`](crate::stream::DeviceOutput) plays through cpal;
//! [`OfflineOutput`] renders on demand for tests and headless use.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use emopet_dsp::{Mixer, MixerCommand};

use crate::error::{EngineError, EngineResult};

/// Lifecycle state of an output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputState {
    /// Created but not producing sound yet
    Suspended,
    Running,
    Closed,
}

/// An audio context: a clock plus a sink for mixer commands
pub trait AudioOutput: Send {
    fn sample_rate(&self) -> u32;

    /// Seconds on the output clock; voices are scheduled against this
    fn current_time(&self) -> f64;

    fn state(&self) -> OutputState;

    /// Start (or restart) producing sound
    fn resume(&mut self) -> EngineResult<()>;

    /// Hand a command to the mixer without blocking
    fn submit(&mut self, command: MixerCommand) -> EngineResult<()>;

    /// Stop producing sound and release the device
    fn close(&mut self);
}

/// Lazily opens the output the first time the engine needs one
pub type OutputFactory = Box<dyn FnMut() -> EngineResult<Box<dyn AudioOutput>> + Send>;

/// Factory for a host with no audio output at all
pub fn unavailable() -> OutputFactory {
    Box::new(|| -> EngineResult<Box<dyn AudioOutput>> {
        Err(EngineError::OutputUnavailable("no audio output".into()))
    })
}

struct OfflineInner {
    mixer: Mixer,
    state: OutputState,
    fail_resume: bool,
    channels: usize,
}

/// Mixer driven by explicit [`render`](OfflineOutput::render) calls
///
/// Clones share the same mixer, so a test can keep one clone while the
/// engine owns another.
#[derive(Clone)]
pub struct OfflineOutput {
    inner: Arc<Mutex<OfflineInner>>,
    sample_rate: u32,
}

impl OfflineOutput {
    /// Stereo offline output
    pub fn new(sample_rate: u32, master_gain: f32) -> EngineResult<Self> {
        let mixer = Mixer::new(sample_rate as f32, master_gain)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(OfflineInner {
                mixer,
                state: OutputState::Suspended,
                fail_resume: false,
                channels: 2,
            })),
            sample_rate,
        })
    }

    /// An output whose `resume` is always rejected, like a host policy refusal
    pub fn failing_resume(sample_rate: u32, master_gain: f32) -> EngineResult<Self> {
        let output = Self::new(sample_rate, master_gain)?;
        output.inner.lock().fail_resume = true;
        Ok(output)
    }

    /// Factory handing out clones of this output
    pub fn factory(&self) -> OutputFactory {
        let output = self.clone();
        Box::new(move || Ok(Box::new(output.clone()) as Box<dyn AudioOutput>))
    }

    /// Render `frames` interleaved stereo frames, advancing the clock
    ///
    /// A suspended or closed output produces silence and keeps its clock.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut inner = self.inner.lock();
        let channels = inner.channels;
        let mut buffer = vec![0.0; frames * channels];
        if inner.state == OutputState::Running {
            inner.mixer.render(&mut buffer, channels);
        }
        buffer
    }

    /// Voices the mixer still holds (scheduled, sounding or fading)
    pub fn active_voices(&self) -> usize {
        self.inner.lock().mixer.active_voices()
    }

    pub fn has_voice(&self, id: emopet_dsp::VoiceId) -> bool {
        self.inner.lock().mixer.has_voice(id)
    }

    /// Master gain at the current output time
    pub fn master_gain(&self) -> f32 {
        let inner = self.inner.lock();
        inner.mixer.master_gain_at(inner.mixer.current_time())
    }
}

impl AudioOutput for OfflineOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.inner.lock().mixer.current_time()
    }

    fn state(&self) -> OutputState {
        self.inner.lock().state
    }

    fn resume(&mut self) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        match inner.state {
            OutputState::Closed => Err(EngineError::OutputClosed),
            _ if inner.fail_resume => Err(EngineError::ResumeFailed(
                "resume rejected by host".into(),
            )),
            _ => {
                inner.state = OutputState::Running;
                Ok(())
            }
        }
    }

    fn submit(&mut self, command: MixerCommand) -> EngineResult<()> {
        let mut inner = self.inner.lock();
        if inner.state == OutputState::Closed {
            return Err(EngineError::OutputClosed);
        }
        inner.mixer.apply(command);
        Ok(())
    }

    fn close(&mut self) {
        let mut inner = self.inner.lock();
        if inner.state != OutputState::Closed {
            debug!("Offline output closed");
            inner.mixer.apply(MixerCommand::StopAll);
            inner.state = OutputState::Closed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emopet_dsp::{ChirpParams, Voice, VoiceId};

    #[test]
    fn test_offline_lifecycle() {
        let mut output = OfflineOutput::new(48000, 0.22).unwrap();
        assert_eq!(output.state(), OutputState::Suspended);

        // Suspended output keeps its clock still
        output.render(480);
        assert_eq!(output.current_time(), 0.0);

        output.resume().unwrap();
        assert_eq!(output.state(), OutputState::Running);
        output.render(4800);
        assert!((output.current_time() - 0.1).abs() < 1e-9);

        output.close();
        assert_eq!(output.state(), OutputState::Closed);
        assert!(output.resume().is_err());
        assert!(output.submit(MixerCommand::StopAll).is_err());
    }

    #[test]
    fn test_clones_share_mixer() {
        let output = OfflineOutput::new(48000, 0.22).unwrap();
        let mut engine_side = output.clone();
        engine_side.resume().unwrap();

        let params = ChirpParams {
            start_freq: 440.0,
            duration: 0.2,
            ..Default::default()
        };
        let id = VoiceId::next();
        engine_side
            .submit(MixerCommand::Start(Box::new(Voice::chirp(id, &params, 0.0))))
            .unwrap();

        assert!(output.has_voice(id));
        let samples = output.render(4800);
        assert_eq!(samples.len(), 9600);
        assert!(samples.iter().any(|s| s.abs() > 0.0));
    }

    #[test]
    fn test_failing_resume() {
        let mut output = OfflineOutput::failing_resume(44100, 0.22).unwrap();
        assert!(matches!(output.resume(), Err(EngineError::ResumeFailed(_))));
        assert_eq!(output.state(), OutputState::Suspended);
    }

    #[test]
    fn test_factories() {
        let output = OfflineOutput::new(48000, 0.22).unwrap();
        let mut factory = output.factory();
        let opened = factory().unwrap();
        assert_eq!(opened.sample_rate(), 48000);

        let mut none = unavailable();
        assert!(none().is_err());
    }
}
