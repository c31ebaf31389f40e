use crate::core::Vec2;

pub const SCALE_MIN: f64 = 0.5;
pub const SCALE_MAX: f64 = 4.0;

/// Additive zoom step applied per desktop wheel notch.
pub const WHEEL_ZOOM_STEP: f64 = 0.1;

pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(SCALE_MIN, SCALE_MAX)
}

/// User-controlled pan/zoom/mirror applied to the photo layer only.
///
/// `offset` is in preview pixels and intentionally unbounded: the user may
/// pan the photo fully outside the visible frame. `scale` is clamped to
/// `[SCALE_MIN, SCALE_MAX]` on every mutation.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformState {
    pub offset: Vec2,
    pub scale: f64,
    pub mirrored: bool,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            mirrored: false,
        }
    }
}

impl TransformState {
    pub fn reset(&mut self, mirror_default: bool) {
        *self = Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            mirrored: mirror_default,
        };
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset += Vec2::new(dx, dy);
    }

    pub fn set_offset(&mut self, offset: Vec2) {
        self.offset = offset;
    }

    /// Additive wheel zoom: positive notches zoom in, negative out.
    pub fn zoom_step(&mut self, notches: f64) {
        self.scale = clamp_scale(self.scale + notches * WHEEL_ZOOM_STEP);
    }

    /// Multiplicative pinch zoom against the scale recorded at pinch start.
    pub fn zoom_pinch(&mut self, start_scale: f64, ratio: f64) {
        self.scale = clamp_scale(start_scale * ratio);
    }
}
