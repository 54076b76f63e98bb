//! Eye geometry synthesis
//!
//! Turns one eye's base rectangle plus the frame's signals into the drawn
//! rectangle and its highlight. Both eyes go through the same function; the
//! parallax illusion comes from feeding them opposite-signed gaze
//! coefficients.

use serde::{Deserialize, Serialize};

use super::config::EyeRect;
use super::signals::{Vec2, MAX_GAZE_OFFSET};

/// How much horizontal gaze grows/shrinks an eye
pub const GAZE_SCALE_STRENGTH: f32 = 0.2;
/// Horizontal gaze shift as a fraction of the base width
pub const GAZE_HORIZONTAL_SHIFT: f32 = 0.15;
/// Vertical shift at full vertical gaze
pub const GAZE_VERTICAL_SHIFT: f32 = 10.0;
/// Eyelid vertical scale while blinking (never exactly zero)
pub const BLINK_SCALE_Y: f32 = 0.01;
/// How far the highlight follows the gaze
pub const HIGHLIGHT_GAZE_FOLLOW: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// +1 for the left eye, −1 for the right: the left eye grows when looking
    /// right while the right one shrinks, and vice versa
    fn gaze_sign(self) -> f32 {
        match self {
            Side::Left => 1.0,
            Side::Right => -1.0,
        }
    }

    /// Highlight sits towards the outer-top corner of each eye
    fn highlight_x(self) -> f32 {
        match self {
            Side::Left => 0.7,
            Side::Right => 0.3,
        }
    }
}

/// Pupil highlight ellipse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub cx: f32,
    pub cy: f32,
    pub rx: f32,
    pub ry: f32,
    pub opacity: f32,
}

/// Final drawn geometry of one eye
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeGeometry {
    pub rect: EyeRect,
    /// Eyelid vertical scale about the rectangle's center
    pub scale_y: f32,
    /// Total size factor applied to the globally scaled base rectangle
    pub scale: f32,
    pub highlight: Highlight,
}

/// Per-frame inputs shared by both eyes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeInputs {
    pub jitter: Vec2,
    /// breathing × audio × emotion pulse
    pub size_scale: f32,
    pub gaze: Vec2,
    pub blinking: bool,
}

/// Build one eye from its globally scaled base rectangle
pub fn synthesize_eye(side: Side, base: EyeRect, inputs: &EyeInputs) -> EyeGeometry {
    let horizontal = inputs.gaze.x / MAX_GAZE_OFFSET;
    let vertical = inputs.gaze.y / MAX_GAZE_OFFSET;
    let sign = side.gaze_sign();

    let gaze_scale = 1.0 + sign * horizontal * GAZE_SCALE_STRENGTH;
    let scale = inputs.size_scale * gaze_scale;

    let width = base.width * scale;
    let height = base.height * scale;
    let x = base.x + inputs.jitter.x - sign * base.width * horizontal * GAZE_HORIZONTAL_SHIFT;
    let y = base.y + inputs.jitter.y + vertical * GAZE_VERTICAL_SHIFT;

    let highlight = Highlight {
        cx: x + width * side.highlight_x() + inputs.gaze.x * HIGHLIGHT_GAZE_FOLLOW,
        cy: y + height * 0.3 + inputs.gaze.y * HIGHLIGHT_GAZE_FOLLOW,
        rx: width * 0.15,
        ry: height * 0.2,
        opacity: if inputs.blinking { 0.0 } else { 1.0 },
    };

    EyeGeometry {
        rect: EyeRect::new(x, y, width, height),
        scale_y: if inputs.blinking { BLINK_SCALE_Y } else { 1.0 },
        scale,
        highlight,
    }
}
