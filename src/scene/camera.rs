use crate::foundation::core::{Extent, Mat4, Vec2, Vec3};
use crate::foundation::error::{AfterimageError, AfterimageResult};

/// Right-handed perspective camera with an optional sub-pixel projection offset.
///
/// While a jitter is applied, [`Camera::projection`] returns the offset projection; every other
/// consumer is expected to observe the camera only after [`Camera::clear_jitter`].
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,
    fov_y_radians: f32,
    aspect: f32,
    near: f32,
    far: f32,
    jitter_ndc: Option<Vec2>,
}

impl Camera {
    /// Create a camera looking from `position` at `target`.
    pub fn perspective(
        position: Vec3,
        target: Vec3,
        fov_y_degrees: f32,
        aspect: f32,
        near: f32,
        far: f32,
    ) -> AfterimageResult<Self> {
        let cam = Self {
            position,
            target,
            up: Vec3::Y,
            fov_y_radians: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
            jitter_ndc: None,
        };
        cam.validate()?;
        Ok(cam)
    }

    fn validate(&self) -> AfterimageResult<()> {
        if !(self.fov_y_radians > 0.0 && self.fov_y_radians < std::f32::consts::PI) {
            return Err(AfterimageError::config("camera fov must be in (0, 180) degrees"));
        }
        if !(self.aspect > 0.0) {
            return Err(AfterimageError::config("camera aspect must be > 0"));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(AfterimageError::config("camera needs 0 < near < far"));
        }
        if (self.target - self.position).length_squared() <= f32::EPSILON {
            return Err(AfterimageError::config("camera target equals its position"));
        }
        Ok(())
    }

    /// World-to-view transform.
    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Projection without any jitter offset.
    pub fn unjittered_projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_radians, self.aspect, self.near, self.far)
    }

    /// Projection as currently presented, including an applied jitter offset.
    pub fn projection(&self) -> Mat4 {
        let base = self.unjittered_projection();
        match self.jitter_ndc {
            // Translating clip space before the divide skews the frustum asymmetrically, so
            // rasterization samples move rather than the finished image.
            Some(offset) => Mat4::from_translation(offset.extend(0.0)) * base,
            None => base,
        }
    }

    /// Offset the projection by `offset_px` pixels (x right, y down) for a target of `extent`.
    pub fn apply_jitter(&mut self, offset_px: Vec2, extent: Extent) {
        let texel = extent.texel_size();
        self.jitter_ndc = Some(Vec2::new(
            2.0 * offset_px.x * texel.x,
            -2.0 * offset_px.y * texel.y,
        ));
    }

    /// Remove any applied jitter offset.
    pub fn clear_jitter(&mut self) {
        self.jitter_ndc = None;
    }

    /// Return `true` while a jitter offset is applied.
    pub fn is_jittered(&self) -> bool {
        self.jitter_ndc.is_some()
    }

    /// Vertical field of view in degrees.
    pub fn fov_y_degrees(&self) -> f32 {
        self.fov_y_radians.to_degrees()
    }

    /// Change the vertical field of view.
    pub fn set_fov_y_degrees(&mut self, degrees: f32) -> AfterimageResult<()> {
        let prev = self.fov_y_radians;
        self.fov_y_radians = degrees.to_radians();
        if let Err(e) = self.validate() {
            self.fov_y_radians = prev;
            return Err(e);
        }
        Ok(())
    }

    /// Change the aspect ratio (typically after a resize).
    pub fn set_aspect(&mut self, aspect: f32) -> AfterimageResult<()> {
        if !(aspect > 0.0) {
            return Err(AfterimageError::config("camera aspect must be > 0"));
        }
        self.aspect = aspect;
        Ok(())
    }

    /// Move the camera.
    pub fn look_at(&mut self, position: Vec3, target: Vec3) -> AfterimageResult<()> {
        if (target - position).length_squared() <= f32::EPSILON {
            return Err(AfterimageError::config("camera target equals its position"));
        }
        self.position = position;
        self.target = target;
        Ok(())
    }

    /// Eye position in world space.
    pub fn position(&self) -> Vec3 {
        self.position
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/camera.rs"]
mod tests;
