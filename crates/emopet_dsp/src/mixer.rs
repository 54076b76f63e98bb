//! Voice Mixer
//!
//! Sums every live voice into an interleaved output buffer and applies the
//! master gain. The mixer owns the output clock: time advances by one frame
//! per rendered frame, starting at zero.
//!
//! The control thread never touches the mixer directly. It sends
//! [`MixerCommand`]s which the audio callback applies between buffers.

use crate::automation::Automation;
use crate::error::DspError;
use crate::voice::{Voice, VoiceId};

/// Maximum number of simultaneously playing voices
pub const MAX_VOICES: usize = 64;

/// Messages from the control thread to the mixer
#[derive(Debug)]
pub enum MixerCommand {
    /// Start playing a voice (boxed so the channel slot stays small)
    Start(Box<Voice>),
    /// Fade a voice out and stop it
    Release(VoiceId),
    /// Exponentially approach a master gain from the current value
    SetMasterTarget { target: f32, time_constant: f32 },
    /// Jump the master gain immediately
    SetMasterGain(f32),
    /// Release every voice
    StopAll,
}

/// Sums voices into an output buffer
pub struct Mixer {
    sample_rate: f32,
    frame: u64,
    voices: Vec<Voice>,
    master: Automation,
}

impl Mixer {
    pub fn new(sample_rate: f32, master_gain: f32) -> Result<Self, DspError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }

        let mut master = Automation::new(master_gain);
        master.set_value_at(master_gain, 0.0);

        Ok(Self {
            sample_rate,
            frame: 0,
            voices: Vec::with_capacity(MAX_VOICES),
            master,
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Output clock in seconds (time of the next frame to be rendered)
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / f64::from(self.sample_rate)
    }

    /// Number of voices that are scheduled or sounding
    pub fn active_voices(&self) -> usize {
        self.voices.len()
    }

    pub fn has_voice(&self, id: VoiceId) -> bool {
        self.voices.iter().any(|v| v.id() == id)
    }

    /// Master gain curve evaluated at `t`
    pub fn master_gain_at(&self, t: f64) -> f32 {
        self.master.value_at(t)
    }

    /// Apply one control message at the current output time
    pub fn apply(&mut self, command: MixerCommand) {
        let now = self.current_time();
        match command {
            MixerCommand::Start(voice) => {
                if self.voices.len() < MAX_VOICES {
                    self.voices.push(*voice);
                }
            }
            MixerCommand::Release(id) => {
                if let Some(voice) = self.voices.iter_mut().find(|v| v.id() == id) {
                    voice.release(now);
                }
            }
            MixerCommand::SetMasterTarget {
                target,
                time_constant,
            } => {
                let held = self.master.value_at(now);
                self.master.restart_at(held, now);
                self.master
                    .set_target_at(target, now, f64::from(time_constant));
            }
            MixerCommand::SetMasterGain(gain) => {
                self.master.restart_at(gain, now);
            }
            MixerCommand::StopAll => {
                for voice in &mut self.voices {
                    voice.release(now);
                }
            }
        }
    }

    /// Render the next `buffer.len() / channels` frames, overwriting `buffer`
    ///
    /// Channel 0 gets the left mix and channel 1 the right. A mono output
    /// gets the average of both; any further channels are silent.
    ///
    /// # Real-time Safety
    /// No allocations. O(frames × voices).
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let sample_rate = f64::from(self.sample_rate);

        for frame in buffer.chunks_mut(channels) {
            let t = self.frame as f64 / sample_rate;
            let (mut left, mut right) = (0.0_f32, 0.0_f32);
            for voice in &mut self.voices {
                let (l, r) = voice.render(t, self.sample_rate);
                left += l;
                right += r;
            }

            let gain = self.master.value_at(t);
            left *= gain;
            right *= gain;

            match frame {
                [mono] => *mono = (left + right) * 0.5,
                [l, r, rest @ ..] => {
                    *l = left;
                    *r = right;
                    rest.fill(0.0);
                }
                [] => {}
            }
            self.frame += 1;
        }

        let now = self.current_time();
        self.voices.retain(|v| !v.is_finished(now));
    }
}
