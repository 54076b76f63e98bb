//! Per-emotion visual parameters
//!
//! Eye rectangles are in the 300×300 view box of the rendered face, before
//! the global eye scale is applied.

use serde::{Deserialize, Serialize};

use crate::emotion::{Emotion, EmotionTable};

/// Axis-aligned rectangle in view box units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl EyeRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Enlarge uniformly while keeping the center fixed
    pub fn scaled_about_center(self, factor: f32) -> Self {
        let width = self.width * factor;
        let height = self.height * factor;
        Self {
            x: self.x - (width - self.width) / 2.0,
            y: self.y - (height - self.height) / 2.0,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Glow filter drawn around both eyes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GlowFilter {
    /// Strong static glow
    Glow,
    /// Gentle glow breathing between blur 4 and 6 every 2 s
    SubtlePulseGlow,
    /// Faint glow breathing between blur 3 and 4 every 2.5 s
    NeutralPulseGlow,
}

impl GlowFilter {
    pub const ALL: [GlowFilter; 3] = [
        GlowFilter::Glow,
        GlowFilter::SubtlePulseGlow,
        GlowFilter::NeutralPulseGlow,
    ];

    /// SVG element id
    pub fn id(self) -> &'static str {
        match self {
            GlowFilter::Glow => "glow",
            GlowFilter::SubtlePulseGlow => "subtlePulseGlow",
            GlowFilter::NeutralPulseGlow => "neutralPulseGlow",
        }
    }

    /// Resting blur standard deviation
    pub fn blur_std_deviation(self) -> f32 {
        match self {
            GlowFilter::Glow => 5.0,
            GlowFilter::SubtlePulseGlow => 4.0,
            GlowFilter::NeutralPulseGlow => 3.0,
        }
    }

    /// Brightness of the blurred halo (colour matrix constant)
    pub fn halo_intensity(self) -> f32 {
        match self {
            GlowFilter::Glow => 0.9,
            GlowFilter::SubtlePulseGlow | GlowFilter::NeutralPulseGlow => 0.8,
        }
    }

    /// Blur pulse as (peak std deviation, half period in ms); `None` if static
    pub fn pulse(self) -> Option<(f32, f64)> {
        match self {
            GlowFilter::Glow => None,
            GlowFilter::SubtlePulseGlow => Some((6.0, 2000.0)),
            GlowFilter::NeutralPulseGlow => Some((4.0, 2500.0)),
        }
    }

    /// Blur standard deviation at `now_ms` (triangle wave between rest and peak)
    pub fn strength_at(self, now_ms: f64) -> f32 {
        let rest = self.blur_std_deviation();
        match self.pulse() {
            None => rest,
            Some((peak, half_period)) => {
                let phase = (now_ms / half_period).rem_euclid(2.0);
                let up = if phase < 1.0 { phase } else { 2.0 - phase };
                rest + (peak - rest) * up as f32
            }
        }
    }
}

/// Eye fill colour palette
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeColor {
    #[default]
    Default,
    Green,
    Blue,
    Red,
}

impl EyeColor {
    /// CSS fill value
    pub fn fill(self) -> &'static str {
        match self {
            EyeColor::Default => "hsl(0, 0%, 10%)",
            EyeColor::Green => "hsl(142.1 76.2% 36.3%)",
            EyeColor::Blue => "hsl(217.2 91.2% 59.8%)",
            EyeColor::Red => "hsl(0 84.2% 60.2%)",
        }
    }
}

impl std::str::FromStr for EyeColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(EyeColor::Default),
            "green" => Ok(EyeColor::Green),
            "blue" => Ok(EyeColor::Blue),
            "red" => Ok(EyeColor::Red),
            other => Err(format!("unknown eye colour: {other}")),
        }
    }
}

pub const DEFAULT_PULSE_BASE_SCALE: f32 = 1.0;
pub const DEFAULT_PULSE_AMPLITUDE: f32 = 0.0;
pub const DEFAULT_JITTER_INTENSITY: f32 = 0.4;
pub const DEFAULT_HEAD_TILT_INTENSITY: f32 = 0.5;

/// Visual parameters of one emotion
///
/// The scalar parameters are optional; an absent (or zero) value falls back
/// to the defaults above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionConfig {
    pub left_eye: EyeRect,
    pub right_eye: EyeRect,
    pub filter: Option<GlowFilter>,
    pub pulse_base_scale: Option<f32>,
    pub pulse_amplitude: Option<f32>,
    pub jitter_intensity: Option<f32>,
    pub head_tilt_intensity: Option<f32>,
}

fn or_default(value: Option<f32>, default: f32) -> f32 {
    value.filter(|v| *v != 0.0).unwrap_or(default)
}

impl EmotionConfig {
    pub fn pulse_base_scale(&self) -> f32 {
        or_default(self.pulse_base_scale, DEFAULT_PULSE_BASE_SCALE)
    }

    pub fn pulse_amplitude(&self) -> f32 {
        or_default(self.pulse_amplitude, DEFAULT_PULSE_AMPLITUDE)
    }

    pub fn jitter_intensity(&self) -> f32 {
        or_default(self.jitter_intensity, DEFAULT_JITTER_INTENSITY)
    }

    pub fn head_tilt_intensity(&self) -> f32 {
        or_default(self.head_tilt_intensity, DEFAULT_HEAD_TILT_INTENSITY)
    }

    /// Built-in parameters for `emotion`
    pub fn builtin(emotion: Emotion) -> Self {
        use Emotion::*;
        use GlowFilter::*;

        // (left x, y, w, h), (right x, y, w, h), filter, base, amplitude, jitter, tilt
        #[rustfmt::skip]
        let (l, r, filter, base, amp, jitter, tilt) = match emotion {
            Neutral => ((50., 68., 65., 65.), (185., 68., 65., 65.), NeutralPulseGlow, 1.0, 0.015, 0.3, 0.4),
            Happy => ((48., 64., 70., 70.), (183., 64., 70., 70.), SubtlePulseGlow, 1.03, 0.045, 0.6, 0.8),
            Sad => ((53., 80., 60., 45.), (188., 80., 60., 45.), SubtlePulseGlow, 0.96, 0.007, 0.1, 0.2),
            Sleepy => ((50., 88., 65., 8.), (185., 88., 65., 8.), SubtlePulseGlow, 0.97, 0.004, 0.05, 0.1),
            Angry => ((45., 72., 70., 25.), (180., 72., 70., 25.), Glow, 1.05, 0.07, 1.5, 1.5),
            Curious => ((45., 60., 70., 75.), (180., 60., 70., 75.), Glow, 1.01, 0.03, 0.8, 0.9),
            Bored => ((52., 77., 60., 50.), (187., 77., 60., 50.), NeutralPulseGlow, 0.97, 0.008, 0.18, 0.28),
            Scared => ((40., 52., 85., 90.), (175., 52., 85., 90.), Glow, 1.08, 0.1, 1.8, 1.8),
            Calm => ((48., 70., 68., 55.), (183., 70., 68., 55.), SubtlePulseGlow, 0.99, 0.006, 0.08, 0.18),
            Love => ((45., 65., 75., 65.), (180., 65., 75., 65.), SubtlePulseGlow, 1.04, 0.05, 0.5, 0.7),
            Excited => ((40., 50., 85., 95.), (175., 50., 85., 95.), Glow, 1.09, 0.12, 1.3, 1.3),
            Confused => ((50., 60., 65., 65.), (185., 70., 65., 65.), NeutralPulseGlow, 1.0, 0.02, 0.7, 0.8),
            Surprised => ((40., 47., 90., 100.), (170., 47., 90., 100.), Glow, 1.06, 0.08, 1.0, 1.0),
            Annoyed => ((50., 75., 65., 32.), (185., 75., 65., 32.), NeutralPulseGlow, 1.01, 0.025, 0.6, 0.7),
            Shy => ((55., 77., 50., 50.), (190., 77., 50., 50.), SubtlePulseGlow, 0.98, 0.01, 0.2, 0.3),
            Proud => ((50., 62., 62., 60.), (185., 62., 62., 60.), SubtlePulseGlow, 1.015, 0.028, 0.4, 0.55),
            Silly => ((45., 65., 70., 67.), (180., 65., 70., 67.), Glow, 1.025, 0.035, 0.9, 1.0),
            Determined => ((45., 72., 70., 42.), (180., 72., 70., 42.), Glow, 1.01, 0.022, 0.55, 0.65),
            Worried => ((48., 72., 65., 53.), (183., 72., 65., 53.), NeutralPulseGlow, 0.985, 0.018, 0.45, 0.55),
            Playful => ((50., 75., 65., 22.), (185., 69., 65., 63.), SubtlePulseGlow, 1.025, 0.035, 0.75, 0.85),
        };

        Self {
            left_eye: EyeRect::new(l.0, l.1, l.2, l.3),
            right_eye: EyeRect::new(r.0, r.1, r.2, r.3),
            filter: Some(filter),
            pulse_base_scale: Some(base),
            pulse_amplitude: Some(amp),
            jitter_intensity: Some(jitter),
            head_tilt_intensity: Some(tilt),
        }
    }
}

/// The built-in table covering all 20 emotions
pub fn emotion_configs() -> EmotionTable<EmotionConfig> {
    EmotionTable::full(EmotionConfig::builtin)
}
