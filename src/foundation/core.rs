use crate::foundation::error::{AfterimageError, AfterimageResult};

pub use glam::{Mat4, UVec2, Vec2, Vec3, Vec4};

/// Linear RGBA color with `f32` channels.
///
/// Channels are straight (not premultiplied). Integer targets clamp to `[0, 1]` on store; float
/// targets keep the value as written.
pub type Rgba = Vec4;

/// Absolute 0-based frame index since the scheduler started.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
    serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl FrameIndex {
    /// The frame after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Pixel dimensions of a render target or the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create a validated, non-empty extent.
    pub fn new(width: u32, height: u32) -> AfterimageResult<Self> {
        if width == 0 || height == 0 {
            return Err(AfterimageError::config("extent must be non-empty"));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered by the extent.
    pub fn texel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Width divided by height.
    pub fn aspect(self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Size of one texel in UV units.
    pub fn texel_size(self) -> Vec2 {
        Vec2::new(1.0 / self.width.max(1) as f32, 1.0 / self.height.max(1) as f32)
    }

    /// Return `true` when either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Build an [`Rgba`] from straight channels.
pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Rgba {
    Vec4::new(r, g, b, a)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
