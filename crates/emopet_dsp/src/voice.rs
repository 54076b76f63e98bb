//! Synthesized Voices
//!
//! A voice is one short sound event: either a *chirp* (an oscillator sweeping
//! between two frequencies under an attack/decay/sustain/release envelope,
//! with optional vibrato) or a *noise burst* (white noise under an
//! attack/sustain/release envelope). Both are placed in the stereo field with
//! an equal-power panner.
//!
//! Voices are built on the control thread with absolute start times on the
//! output clock, then handed to the [`Mixer`](crate::Mixer), which renders
//! them sample by sample without allocating.

use std::f64::consts::{FRAC_PI_2, TAU};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::automation::{Automation, SILENCE};
use crate::oscillator::{Oscillator, Waveform};

/// Unique identifier of a voice inside a mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(u64);

impl VoiceId {
    /// Allocate a fresh id (process-wide, monotonically increasing)
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        VoiceId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// How the chirp frequency travels from start to end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepCurve {
    Linear,
    #[default]
    Exponential,
}

/// Low-frequency modulation of a chirp's frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    /// LFO rate in Hz
    pub speed: f32,
    /// Frequency deviation in Hz
    pub depth: f32,
    /// Seconds after the voice start before the LFO kicks in
    pub delay: f32,
}

impl Vibrato {
    pub fn new(speed: f32, depth: f32) -> Self {
        Self {
            speed,
            depth,
            delay: 0.0,
        }
    }

    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay;
        self
    }
}

/// Parameters of a frequency-sweeping tone
///
/// All times are in seconds, relative to the moment the voice is scheduled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpParams {
    pub start_freq: f32,
    /// Defaults to `start_freq` (no sweep)
    pub end_freq: Option<f32>,
    pub duration: f32,
    pub wave: Waveform,
    pub volume: f32,
    pub attack: f32,
    pub decay: f32,
    /// Sustain level as a fraction of `volume`
    pub sustain: f32,
    pub release: f32,
    pub vibrato: Option<Vibrato>,
    pub sweep: SweepCurve,
    pub offset: f32,
    /// Stereo position, -1 (left) to 1 (right)
    pub pan: f32,
}

impl Default for ChirpParams {
    fn default() -> Self {
        Self {
            start_freq: 440.0,
            end_freq: None,
            duration: 0.3,
            wave: Waveform::Sine,
            volume: 0.12,
            attack: 0.02,
            decay: 0.08,
            sustain: 0.6,
            release: 0.18,
            vibrato: None,
            sweep: SweepCurve::Exponential,
            offset: 0.0,
            pan: 0.0,
        }
    }
}

/// Parameters of a white-noise burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    pub duration: f32,
    pub volume: f32,
    pub attack: f32,
    pub release: f32,
    pub offset: f32,
    pub pan: f32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            duration: 0.2,
            volume: 0.12,
            attack: 0.01,
            release: 0.18,
            offset: 0.0,
            pan: 0.0,
        }
    }
}

/// Fade applied when a voice is stopped early
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeOut {
    /// Length of the gain ramp down to silence
    pub ramp: f64,
    /// When the source is hard-stopped, measured from the stop request
    pub stop: f64,
}

impl FadeOut {
    /// Chirps fade a little slower than noise so the pitch tail is not cut
    pub const CHIRP: FadeOut = FadeOut {
        ramp: 0.08,
        stop: 0.09,
    };
    pub const NOISE: FadeOut = FadeOut {
        ramp: 0.06,
        stop: 0.07,
    };
}

/// Equal-power stereo gains for a pan position
#[inline]
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(-1.0, 1.0);
    let x = f64::from(pan + 1.0) * 0.5 * FRAC_PI_2;
    (x.cos() as f32, x.sin() as f32)
}

#[derive(Debug, Clone)]
enum Source {
    Tone {
        oscillator: Oscillator,
        frequency: Automation,
        vibrato: Option<(Vibrato, f64, f64)>, // (params, lfo start, lfo stop)
    },
    Noise {
        buffer: Arc<[f32]>,
        position: usize,
    },
}

/// One renderable sound event
#[derive(Debug, Clone)]
pub struct Voice {
    id: VoiceId,
    source: Source,
    gain: Automation,
    pan: (f32, f32),
    start_time: f64,
    stop_time: f64,
    fade: FadeOut,
    lifetime: f32,
}

impl Voice {
    /// Build a chirp starting at `now + params.offset` on the output clock
    pub fn chirp(id: VoiceId, params: &ChirpParams, now: f64) -> Self {
        let duration = f64::from(params.duration.max(0.001));
        let start = now + f64::from(params.offset.max(0.0));
        let end = start + duration;
        let attack = f64::from(params.attack.max(0.0));
        let decay = f64::from(params.decay.max(0.0));
        let release = f64::from(params.release.max(0.0));
        let sustain_level = params.volume * params.sustain;

        let mut gain = Automation::new(SILENCE);
        gain.set_value_at(SILENCE, start);
        gain.linear_ramp_to(params.volume, start + attack);
        gain.linear_ramp_to(sustain_level, start + attack + decay);
        let sustain_end = (start + attack + decay).max(end - release);
        gain.set_value_at(sustain_level, sustain_end);
        gain.linear_ramp_to(SILENCE, end);

        // A geometric sweep is undefined through zero, so anything that is not
        // strictly positive at both ends sweeps linearly instead.
        let start_freq = params.start_freq.max(0.0);
        let end_freq = params.end_freq.unwrap_or(params.start_freq).max(0.0);
        let mut frequency = Automation::new(start_freq);
        frequency.set_value_at(start_freq, start);
        match params.sweep {
            SweepCurve::Exponential if start_freq > 0.0 && end_freq > 0.0 => {
                frequency.exponential_ramp_to(end_freq, end)
            }
            _ => frequency.linear_ramp_to(end_freq, end),
        }

        let vibrato = params
            .vibrato
            .map(|v| (v, start + f64::from(v.delay.max(0.0)), end));

        Self {
            id,
            source: Source::Tone {
                oscillator: Oscillator::new(params.wave),
                frequency,
                vibrato,
            },
            gain,
            pan: pan_gains(params.pan),
            start_time: start,
            stop_time: end,
            fade: FadeOut::CHIRP,
            lifetime: params.duration,
        }
    }

    /// Build a noise burst starting at `now + params.offset` on the output clock
    pub fn noise(id: VoiceId, params: &NoiseParams, now: f64, buffer: Arc<[f32]>) -> Self {
        let duration = f64::from(params.duration.max(0.001));
        let start = now + f64::from(params.offset.max(0.0));
        let end = start + duration;
        let attack = f64::from(params.attack.max(0.0));
        let release = f64::from(params.release.max(0.0));

        let mut gain = Automation::new(SILENCE);
        gain.set_value_at(SILENCE, start);
        gain.linear_ramp_to(params.volume, start + attack);
        gain.set_value_at(params.volume, (start + attack).max(end - release));
        gain.linear_ramp_to(SILENCE, end);

        Self {
            id,
            source: Source::Noise {
                buffer,
                position: 0,
            },
            gain,
            pan: pan_gains(params.pan),
            start_time: start,
            stop_time: end,
            fade: FadeOut::NOISE,
            lifetime: params.duration,
        }
    }

    pub fn id(&self) -> VoiceId {
        self.id
    }

    /// Nominal duration in seconds (not counting the offset)
    pub fn lifetime(&self) -> f32 {
        self.lifetime
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }

    pub fn is_noise(&self) -> bool {
        matches!(self.source, Source::Noise { .. })
    }

    /// Whether the voice can produce no more sound at time `t`
    #[inline]
    pub fn is_finished(&self, t: f64) -> bool {
        t >= self.stop_time
    }

    /// Current envelope gain
    pub fn gain_at(&self, t: f64) -> f32 {
        self.gain.value_at(t)
    }

    /// Instantaneous frequency including vibrato (`None` for noise)
    pub fn frequency_at(&self, t: f64) -> Option<f32> {
        match &self.source {
            Source::Tone {
                frequency, vibrato, ..
            } => {
                let mut f = frequency.value_at(t);
                if let Some((v, lfo_start, lfo_stop)) = vibrato {
                    if t >= *lfo_start && t < *lfo_stop {
                        let phase = (t - lfo_start) * f64::from(v.speed) * TAU;
                        f += v.depth * phase.sin() as f32;
                    }
                }
                Some(f)
            }
            Source::Noise { .. } => None,
        }
    }

    /// Fade out quickly from wherever the envelope is at `now`, then stop
    ///
    /// Calling this twice keeps the earlier stop time.
    pub fn release(&mut self, now: f64) {
        self.gain.cancel_and_hold_at(now);
        self.gain.linear_ramp_to(SILENCE, now + self.fade.ramp);
        self.stop_time = self.stop_time.min(now + self.fade.stop);
        if let Source::Tone {
            vibrato: Some((_, _, lfo_stop)),
            ..
        } = &mut self.source
        {
            *lfo_stop = lfo_stop.min(now + self.fade.stop);
        }
    }

    /// Render one stereo frame at time `t`
    ///
    /// # Real-time Safety
    /// No allocations, O(envelope events).
    #[inline]
    pub fn render(&mut self, t: f64, sample_rate: f32) -> (f32, f32) {
        if t < self.start_time || t >= self.stop_time {
            return (0.0, 0.0);
        }

        let frequency = self.frequency_at(t);
        let raw = match &mut self.source {
            Source::Tone { oscillator, .. } => {
                oscillator.next_sample(frequency.unwrap_or(0.0), sample_rate)
            }
            Source::Noise { buffer, position } => {
                // Buffer is one second long, bursts are shorter; no looping
                let s = buffer.get(*position).copied().unwrap_or(0.0);
                *position += 1;
                s
            }
        };

        let s = raw * self.gain.value_at(t);
        (s * self.pan.0, s * self.pan.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn peak_between(voice: &mut Voice, from: f64, to: f64) -> f32 {
        let mut peak = 0.0_f32;
        let mut t = from;
        while t < to {
            let (l, r) = voice.render(t, SR);
            peak = peak.max(l.abs()).max(r.abs());
            t += 1.0 / f64::from(SR);
        }
        peak
    }

    #[test]
    fn test_voice_ids_are_unique() {
        let a = VoiceId::next();
        let b = VoiceId::next();
        assert_ne!(a, b);
        assert!(b.get() > a.get());
    }

    #[test]
    fn test_pan_center_is_equal_power() {
        let (l, r) = pan_gains(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_pan_is_clamped() {
        let (l, r) = pan_gains(5.0);
        assert!(l.abs() < 1e-6);
        assert!((r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_chirp_envelope_points() {
        let params = ChirpParams {
            start_freq: 400.0,
            duration: 0.5,
            volume: 0.1,
            attack: 0.02,
            decay: 0.08,
            sustain: 0.5,
            release: 0.2,
            ..Default::default()
        };
        let voice = Voice::chirp(VoiceId::next(), &params, 1.0);

        assert!((voice.gain_at(1.02) - 0.1).abs() < 1e-4);
        assert!((voice.gain_at(1.2) - 0.05).abs() < 1e-4);
        assert!((voice.gain_at(1.3) - 0.05).abs() < 1e-4);
        assert!(voice.gain_at(1.4) < 0.05);
        assert!((voice.gain_at(1.5) - SILENCE).abs() < 1e-6);
    }

    #[test]
    fn test_chirp_respects_offset() {
        let params = ChirpParams {
            offset: 0.25,
            ..Default::default()
        };
        let mut voice = Voice::chirp(VoiceId::next(), &params, 0.0);
        assert_eq!(voice.start_time(), 0.25);
        assert_eq!(voice.render(0.1, SR), (0.0, 0.0));
        assert_eq!(voice.lifetime(), params.duration);
    }

    #[test]
    fn test_exponential_sweep_from_zero_is_linear() {
        let params = ChirpParams {
            start_freq: 0.0,
            end_freq: Some(200.0),
            duration: 1.0,
            sweep: SweepCurve::Exponential,
            ..Default::default()
        };
        let voice = Voice::chirp(VoiceId::next(), &params, 0.0);

        assert_eq!(voice.frequency_at(0.0), Some(0.0));
        let mid = voice.frequency_at(0.5).unwrap();
        assert!((mid - 100.0).abs() < 1e-3, "expected linear midpoint, got {}", mid);
        let end = voice.frequency_at(1.0).unwrap();
        assert!((end - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_exponential_sweep_positive_endpoints() {
        let params = ChirpParams {
            start_freq: 100.0,
            end_freq: Some(400.0),
            duration: 1.0,
            ..Default::default()
        };
        let voice = Voice::chirp(VoiceId::next(), &params, 0.0);
        let mid = voice.frequency_at(0.5).unwrap();
        assert!((mid - 200.0).abs() < 0.1);
    }

    #[test]
    fn test_vibrato_waits_for_delay() {
        let params = ChirpParams {
            start_freq: 300.0,
            duration: 1.0,
            vibrato: Some(Vibrato::new(5.0, 10.0).with_delay(0.5)),
            ..Default::default()
        };
        let voice = Voice::chirp(VoiceId::next(), &params, 0.0);

        // Before the delay: plain tone
        assert!((voice.frequency_at(0.05).unwrap() - 300.0).abs() < 1e-3);
        // A quarter LFO period after the delay: full deviation
        let f = voice.frequency_at(0.55).unwrap();
        assert!((f - 310.0).abs() < 0.01, "got {}", f);
    }

    #[test]
    fn test_chirp_renders_sound() {
        let params = ChirpParams {
            start_freq: 500.0,
            duration: 0.3,
            ..Default::default()
        };
        let mut voice = Voice::chirp(VoiceId::next(), &params, 0.0);
        let peak = peak_between(&mut voice, 0.0, 0.3);
        assert!(peak > 0.01);
        assert!(peak <= params.volume);
        assert!(!voice.is_finished(0.2));
        assert!(voice.is_finished(0.31));
    }

    #[test]
    fn test_release_fades_and_stops_early() {
        let params = ChirpParams {
            duration: 1.0,
            ..Default::default()
        };
        let mut voice = Voice::chirp(VoiceId::next(), &params, 0.0);
        voice.release(0.2);

        assert!((voice.stop_time() - 0.29).abs() < 1e-9);
        assert!(voice.gain_at(0.28) <= SILENCE + 1e-4);

        // A second release can't push the stop time out
        voice.release(0.25);
        assert!(voice.stop_time() <= 0.29 + 1e-9);
    }

    #[test]
    fn test_release_before_start_is_silent() {
        let params = ChirpParams {
            offset: 0.5,
            ..Default::default()
        };
        let mut voice = Voice::chirp(VoiceId::next(), &params, 0.0);
        voice.release(0.0);
        assert!(voice.is_finished(0.5));
        assert_eq!(voice.render(0.6, SR), (0.0, 0.0));
    }

    #[test]
    fn test_noise_burst_envelope_and_fade() {
        let buffer: Arc<[f32]> = vec![0.5; 48000].into();
        let params = NoiseParams {
            duration: 0.2,
            volume: 0.08,
            attack: 0.005,
            release: 0.1,
            ..Default::default()
        };
        let mut voice = Voice::noise(VoiceId::next(), &params, 0.0, buffer);
        assert!(voice.is_noise());
        assert!((voice.gain_at(0.05) - 0.08).abs() < 1e-4);
        assert!(voice.frequency_at(0.05).is_none());

        voice.release(0.05);
        assert!((voice.stop_time() - 0.12).abs() < 1e-9);
    }
}
