use crate::foundation::core::{Rgba, UVec2, Vec2};
use crate::foundation::math::{ndc_delta_to_uv, uv_in_unit_square};
use crate::render::backend::TargetId;
use crate::render::blit::{Bindings, FullscreenProgram, PassInputs};
use crate::render::image::ColorImage;
use crate::temporal::motion::decode_motion;

/// Min, max and mean of a 3x3 neighborhood (center included).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighborhood {
    /// Componentwise minimum.
    pub min: Rgba,
    /// Componentwise maximum.
    pub max: Rgba,
    /// Average of the nine texels.
    pub mean: Rgba,
}

impl Neighborhood {
    /// Gather around `(x, y)` with clamp-to-edge addressing.
    pub fn gather(image: &ColorImage, x: i64, y: i64) -> Self {
        let mut min = Rgba::splat(f32::INFINITY);
        let mut max = Rgba::splat(f32::NEG_INFINITY);
        let mut sum = Rgba::ZERO;
        for dy in -1..=1 {
            for dx in -1..=1 {
                let t = image.texel(x + dx, y + dy);
                min = min.min(t);
                max = max.max(t);
                sum += t;
            }
        }
        Self {
            min,
            max,
            mean: sum / 9.0,
        }
    }

    /// Clamp a history color into the neighborhood's bounding box.
    pub fn clamp(&self, history: Rgba) -> Rgba {
        history.clamp(self.min, self.max)
    }
}

/// Contrast-adaptive weight of the current frame: `clamp(k · |mean − current|, 0, 1)` over RGB.
pub fn blend_weight(mean: Rgba, current: Rgba, contrast_weight: f32) -> f32 {
    (contrast_weight * (mean - current).truncate().length()).clamp(0.0, 1.0)
}

/// Full-screen resolve: reproject history through the motion buffer, clamp it to the current
/// neighborhood and blend it with the current frame.
///
/// The pass source is the current (jittered) color; history and motion are bound inputs.
#[derive(Clone, Copy, Debug)]
pub struct ResolveProgram {
    /// Accumulated history target.
    pub history: TargetId,
    /// Encoded motion target.
    pub motion: TargetId,
    /// `k` in the blend weight.
    pub contrast_weight: f32,
    /// Scale the motion buffer was encoded with.
    pub motion_scale: f32,
}

impl ResolveProgram {
    /// Resolve one pixel from explicit inputs.
    pub fn resolve_texel(
        &self,
        current: &ColorImage,
        history: &ColorImage,
        motion: &ColorImage,
        pixel: UVec2,
        uv: Vec2,
    ) -> Rgba {
        let (x, y) = (i64::from(pixel.x), i64::from(pixel.y));
        let color = current.texel(x, y);

        let displacement = decode_motion(motion.texel(x, y), self.motion_scale);
        let prev_uv = uv - ndc_delta_to_uv(displacement.truncate());
        if !uv_in_unit_square(prev_uv) {
            return color;
        }

        let hood = Neighborhood::gather(current, x, y);
        let clamped = hood.clamp(history.sample_bilinear(prev_uv));
        let w = blend_weight(hood.mean, color, self.contrast_weight);
        clamped.lerp(color, w)
    }
}

impl FullscreenProgram for ResolveProgram {
    fn label(&self) -> &'static str {
        "taa-resolve"
    }

    fn bindings(&self) -> Bindings {
        Bindings::from_slice(&[self.history, self.motion])
    }

    fn shade(&self, inputs: &PassInputs<'_>, pixel: UVec2, uv: Vec2) -> Rgba {
        let current = inputs.source();
        match (inputs.bound(self.history), inputs.bound(self.motion)) {
            (Some(history), Some(motion)) => {
                self.resolve_texel(current, history, motion, pixel, uv)
            }
            _ => current.texel(i64::from(pixel.x), i64::from(pixel.y)),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/temporal/resolve.rs"]
mod tests;
