use crate::foundation::core::{Extent, Rgba, UVec2, Vec2, Vec3, Vec4};
use crate::render::backend::{Fragment, PixelFormat, SurfaceProgram};
use crate::render::image::quantize;

/// Standard 4x rotated-grid sample positions, relative to the pixel corner.
static SAMPLES_4X: [Vec2; 4] = [
    Vec2::new(0.375, 0.125),
    Vec2::new(0.875, 0.375),
    Vec2::new(0.125, 0.625),
    Vec2::new(0.625, 0.875),
];

static SAMPLES_2X: [Vec2; 2] = [Vec2::new(0.75, 0.75), Vec2::new(0.25, 0.25)];

static SAMPLES_8X: [Vec2; 8] = [
    Vec2::new(0.5625, 0.3125),
    Vec2::new(0.4375, 0.6875),
    Vec2::new(0.8125, 0.5625),
    Vec2::new(0.3125, 0.1875),
    Vec2::new(0.1875, 0.8125),
    Vec2::new(0.0625, 0.4375),
    Vec2::new(0.6875, 0.9375),
    Vec2::new(0.9375, 0.0625),
];

/// Sample positions inside a pixel for a supported sample count.
pub(crate) fn sample_pattern(samples: u32) -> Option<&'static [Vec2]> {
    static CENTER: [Vec2; 1] = [Vec2::new(0.5, 0.5)];
    match samples {
        1 => Some(&CENTER),
        2 => Some(&SAMPLES_2X),
        4 => Some(&SAMPLES_4X),
        8 => Some(&SAMPLES_8X),
        _ => None,
    }
}

/// Multisampled color + depth storage; `samples.len()` entries per pixel.
pub(crate) struct SampleBuffer {
    pub(crate) extent: Extent,
    pub(crate) format: PixelFormat,
    pub(crate) samples: &'static [Vec2],
    pub(crate) color: Vec<Rgba>,
    pub(crate) depth: Vec<f32>,
}

impl SampleBuffer {
    pub(crate) fn new(extent: Extent, format: PixelFormat, samples: &'static [Vec2]) -> Self {
        let n = extent.texel_count() * samples.len();
        Self {
            extent,
            format,
            samples,
            color: vec![Rgba::ZERO; n],
            depth: vec![1.0; n],
        }
    }

    pub(crate) fn clear(&mut self, color: Rgba) {
        self.color.fill(quantize(self.format, color));
        self.depth.fill(1.0);
    }

    /// Average the samples of every pixel.
    pub(crate) fn resolve(&self) -> Vec<Rgba> {
        let s = self.samples.len();
        let inv = 1.0 / s as f32;
        self.color
            .chunks_exact(s)
            .map(|px| px.iter().copied().sum::<Rgba>() * inv)
            .collect()
    }
}

#[derive(Clone, Copy, Debug)]
struct ClipVertex {
    clip: Vec4,
    object: Vec3,
}

impl ClipVertex {
    fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            clip: self.clip.lerp(other.clip, t),
            object: self.object.lerp(other.object, t),
        }
    }
}

/// Clip a triangle against the near plane (`z >= 0` in clip space for `[0, 1]` depth).
fn clip_near(tri: [ClipVertex; 3]) -> Vec<ClipVertex> {
    let mut out = Vec::with_capacity(4);
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        let (da, db) = (a.clip.z, b.clip.z);
        if da >= 0.0 {
            out.push(a);
        }
        if (da >= 0.0) != (db >= 0.0) {
            out.push(a.lerp(b, da / (da - db)));
        }
    }
    out
}

struct ScreenVertex {
    pos: Vec2,
    z: f32,
    inv_w: f32,
    object_over_w: Vec3,
}

fn to_screen(v: ClipVertex, extent: Extent) -> Option<ScreenVertex> {
    if v.clip.w <= f32::EPSILON {
        return None;
    }
    let inv_w = 1.0 / v.clip.w;
    let ndc = v.clip.truncate() * inv_w;
    Some(ScreenVertex {
        pos: Vec2::new(
            (ndc.x * 0.5 + 0.5) * extent.width as f32,
            (0.5 - ndc.y * 0.5) * extent.height as f32,
        ),
        z: ndc.z,
        inv_w,
        object_over_w: v.object * inv_w,
    })
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Rasterize one object-space triangle already transformed to clip space.
///
/// Triangles are double-sided. Depth test is strict less-than against `[0, 1]` depth. Each
/// covered pixel is shaded once, at its first covered sample, and the result is written to
/// every covered sample (multisample semantics).
pub(crate) fn draw_triangle(
    buf: &mut SampleBuffer,
    clip: [Vec4; 3],
    object: [Vec3; 3],
    program: &dyn SurfaceProgram,
) {
    let tri = [0, 1, 2].map(|i| ClipVertex {
        clip: clip[i],
        object: object[i],
    });
    let poly = clip_near(tri);
    if poly.len() < 3 {
        return;
    }
    for i in 1..poly.len() - 1 {
        let screen = [poly[0], poly[i], poly[i + 1]].map(|v| to_screen(v, buf.extent));
        if let [Some(a), Some(b), Some(c)] = screen {
            fill_screen_triangle(buf, [a, b, c], program);
        }
    }
}

fn fill_screen_triangle(
    buf: &mut SampleBuffer,
    v: [ScreenVertex; 3],
    program: &dyn SurfaceProgram,
) {
    let area = edge(v[0].pos, v[1].pos, v[2].pos);
    if area.abs() <= f32::EPSILON {
        return;
    }
    let inv_area = 1.0 / area;

    let min = v[0].pos.min(v[1].pos).min(v[2].pos).floor().max(Vec2::ZERO);
    let max = v[0]
        .pos
        .max(v[1].pos)
        .max(v[2].pos)
        .ceil()
        .min(Vec2::new(buf.extent.width as f32, buf.extent.height as f32));
    if min.x >= max.x || min.y >= max.y {
        return;
    }

    let width = buf.extent.width as usize;
    let spp = buf.samples.len();
    for py in min.y as u32..max.y as u32 {
        for px in min.x as u32..max.x as u32 {
            let mut shaded: Option<Rgba> = None;
            for (si, offset) in buf.samples.iter().enumerate() {
                let p = Vec2::new(px as f32, py as f32) + *offset;
                let b0 = edge(v[1].pos, v[2].pos, p) * inv_area;
                let b1 = edge(v[2].pos, v[0].pos, p) * inv_area;
                let b2 = edge(v[0].pos, v[1].pos, p) * inv_area;
                if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                    continue;
                }
                let z = b0 * v[0].z + b1 * v[1].z + b2 * v[2].z;
                if !(0.0..=1.0).contains(&z) {
                    continue;
                }
                let idx = (py as usize * width + px as usize) * spp + si;
                if z >= buf.depth[idx] {
                    continue;
                }

                let color = match shaded {
                    Some(c) => c,
                    None => {
                        let inv_w = b0 * v[0].inv_w + b1 * v[1].inv_w + b2 * v[2].inv_w;
                        let object = (v[0].object_over_w * b0
                            + v[1].object_over_w * b1
                            + v[2].object_over_w * b2)
                            / inv_w;
                        let ndc = Vec3::new(
                            p.x / buf.extent.width as f32 * 2.0 - 1.0,
                            1.0 - p.y / buf.extent.height as f32 * 2.0,
                            z,
                        );
                        let c = quantize(
                            buf.format,
                            program.shade(&Fragment {
                                object_pos: object,
                                ndc,
                                pixel: UVec2::new(px, py),
                            }),
                        );
                        shaded = Some(c);
                        c
                    }
                };
                buf.depth[idx] = z;
                buf.color[idx] = color;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
