use crate::foundation::core::Vec3;
use crate::foundation::error::{AfterimageError, AfterimageResult};

/// Indexed triangle mesh in object space.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Mesh {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Triangles as counter-clockwise vertex index triples.
    pub triangles: Vec<[u32; 3]>,
}

impl Mesh {
    /// Build a mesh and check that every index is in range.
    pub fn new(positions: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> AfterimageResult<Self> {
        let mesh = Self {
            positions,
            triangles,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    /// Check index bounds.
    pub fn validate(&self) -> AfterimageResult<()> {
        let n = self.positions.len();
        for tri in &self.triangles {
            if tri.iter().any(|&i| i as usize >= n) {
                return Err(AfterimageError::config(format!(
                    "mesh triangle {tri:?} indexes past {n} vertices"
                )));
            }
        }
        Ok(())
    }

    /// Axis-aligned rectangle in the XY plane, centered at the origin, facing +Z.
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
            triangles: vec![[0, 1, 2], [0, 2, 3]],
        }
    }

    /// Axis-aligned cube with edge length `size`, centered at the origin.
    pub fn cube(size: f32) -> Self {
        let h = size * 0.5;
        let positions = vec![
            Vec3::new(-h, -h, -h),
            Vec3::new(h, -h, -h),
            Vec3::new(h, h, -h),
            Vec3::new(-h, h, -h),
            Vec3::new(-h, -h, h),
            Vec3::new(h, -h, h),
            Vec3::new(h, h, h),
            Vec3::new(-h, h, h),
        ];
        let triangles = vec![
            // +Z
            [4, 5, 6],
            [4, 6, 7],
            // -Z
            [1, 0, 3],
            [1, 3, 2],
            // +X
            [5, 1, 2],
            [5, 2, 6],
            // -X
            [0, 4, 7],
            [0, 7, 3],
            // +Y
            [7, 6, 2],
            [7, 2, 3],
            // -Y
            [0, 1, 5],
            [0, 5, 4],
        ];
        Self {
            positions,
            triangles,
        }
    }
}
