use glam::{Vec2, Vec3, Vec4};

/// Radical inverse of `index` in `base` (the `index`-th Halton value for that base).
///
/// Index 0 maps to 0 for every base.
pub(crate) fn radical_inverse(mut index: u32, base: u32) -> f32 {
    let inv_base = 1.0 / f64::from(base);
    let mut fraction = inv_base;
    let mut result = 0.0f64;
    while index > 0 {
        result += f64::from(index % base) * fraction;
        index /= base;
        fraction *= inv_base;
    }
    result as f32
}

/// Perspective divide of a clip-space position.
///
/// Returns `None` for points on or behind the eye plane.
pub(crate) fn clip_to_ndc(clip: Vec4) -> Option<Vec3> {
    if clip.w.abs() <= f32::EPSILON {
        return None;
    }
    Some(clip.truncate() / clip.w)
}

/// Map NDC (`y` up, `[-1, 1]`) to UV (`v` down, `[0, 1]`).
pub(crate) fn ndc_to_uv(ndc: Vec2) -> Vec2 {
    Vec2::new(ndc.x * 0.5 + 0.5, 0.5 - ndc.y * 0.5)
}

/// Map an NDC displacement to the equivalent UV displacement.
pub(crate) fn ndc_delta_to_uv(delta: Vec2) -> Vec2 {
    Vec2::new(delta.x * 0.5, -delta.y * 0.5)
}

/// Return `true` when both UV components lie inside `[0, 1]`.
pub(crate) fn uv_in_unit_square(uv: Vec2) -> bool {
    (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
