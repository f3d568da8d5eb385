use crate::foundation::core::{Rgba, Vec3};

/// Checkerboard modulation evaluated in object space.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Checker {
    /// Cells per object-space unit.
    pub cells_per_unit: f32,
    /// Color of the odd cells.
    pub alt_color: Rgba,
}

/// Unlit surface description used by the reference renderer.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Material {
    /// Base color.
    pub base_color: Rgba,
    /// Optional checkerboard modulation.
    pub checker: Option<Checker>,
}

impl Material {
    /// A flat, single-color material.
    pub fn flat(base_color: Rgba) -> Self {
        Self {
            base_color,
            checker: None,
        }
    }

    /// A checkerboard material alternating `base_color` and `alt_color`.
    pub fn checker(base_color: Rgba, alt_color: Rgba, cells_per_unit: f32) -> Self {
        Self {
            base_color,
            checker: Some(Checker {
                cells_per_unit,
                alt_color,
            }),
        }
    }

    /// Evaluate the material at an object-space position.
    pub fn color_at(&self, object_pos: Vec3) -> Rgba {
        let Some(checker) = self.checker else {
            return self.base_color;
        };
        let cell = (object_pos * checker.cells_per_unit).floor();
        let parity = (cell.x + cell.y + cell.z).rem_euclid(2.0);
        if parity < 0.5 {
            self.base_color
        } else {
            checker.alt_color
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::flat(Rgba::ONE)
    }
}
