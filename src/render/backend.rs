use std::collections::BTreeMap;

use crate::foundation::core::{Extent, Rgba, UVec2, Vec3};
use crate::foundation::error::AfterimageResult;
use crate::render::blit::FullscreenProgram;
use crate::render::image::ColorImage;
use crate::scene::camera::Camera;
use crate::scene::graph::{ObjectId, Scene};
use crate::scene::material::Material;

/// Identifier of an off-screen render target owned by a [`Renderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetId(pub u32);

/// Where a pass writes: the presentation surface or an off-screen target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The presentation surface.
    Display,
    /// An off-screen target.
    Offscreen(TargetId),
}

/// Channel storage of a render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit normalized integer channels, clamped to `[0, 1]`.
    Rgba8Unorm,
    /// 16-bit float channels.
    Rgba16Float,
    /// 32-bit float channels.
    Rgba32Float,
}

impl PixelFormat {
    /// Return `true` for floating-point formats.
    pub fn is_float(self) -> bool {
        !matches!(self, Self::Rgba8Unorm)
    }

    /// Storage size of one texel.
    pub fn bytes_per_texel(self) -> usize {
        match self {
            Self::Rgba8Unorm => 4,
            Self::Rgba16Float => 8,
            Self::Rgba32Float => 16,
        }
    }
}

/// Off-screen target declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    /// Debug label; also the key for per-label allocation counters.
    pub label: &'static str,
    /// Dimensions.
    pub extent: Extent,
    /// Channel storage.
    pub format: PixelFormat,
}

impl TargetDesc {
    /// Storage size of the whole target.
    pub fn byte_len(&self) -> usize {
        self.extent
            .texel_count()
            .saturating_mul(self.format.bytes_per_texel())
    }
}

/// Description of the graphics context backing the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextDesc {
    /// Display dimensions.
    pub extent: Extent,
    /// Samples per display pixel; values above 1 make the display multisampled.
    pub samples: u32,
}

/// Inputs available to a surface program for one fragment.
#[derive(Clone, Copy, Debug)]
pub struct Fragment {
    /// Perspective-correct object-space position.
    pub object_pos: Vec3,
    /// Normalized device coordinates of the shaded sample.
    pub ndc: Vec3,
    /// Pixel being shaded.
    pub pixel: UVec2,
}

/// Per-fragment shading program used when rasterizing drawables.
pub trait SurfaceProgram {
    /// Color of one fragment.
    fn shade(&self, frag: &Fragment) -> Rgba;
}

impl SurfaceProgram for Material {
    fn shade(&self, frag: &Fragment) -> Rgba {
        self.color_at(frag.object_pos)
    }
}

/// Per-object program substitution for a single render call.
pub trait ShadingOverride {
    /// Program replacing the material of `id`; `None` skips the object for this render.
    fn program_for(&self, id: ObjectId) -> Option<&dyn SurfaceProgram>;

    /// Clear color replacing the scene background for this render.
    fn clear_color(&self) -> Option<Rgba> {
        None
    }
}

/// How drawables are shaded during [`Renderer::render`].
///
/// Overrides never touch the drawables themselves, so the substitution ends with the call.
#[derive(Clone, Copy)]
pub enum Shading<'a> {
    /// Use each drawable's own material.
    Materials,
    /// Substitute programs per object.
    Override(&'a dyn ShadingOverride),
}

/// A full-screen pass: every destination pixel is produced by `program`.
#[derive(Clone, Copy)]
pub struct FullscreenPass<'a> {
    /// Primary input.
    pub source: TargetId,
    /// Output; must not be one of the pass inputs.
    pub destination: RenderTarget,
    /// Per-pixel program; additional inputs come from [`FullscreenProgram::bindings`].
    pub program: &'a dyn FullscreenProgram,
}

/// Allocation and work counters of a renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RendererStats {
    /// Targets created over the renderer's lifetime.
    pub targets_created: u64,
    /// Targets released over the renderer's lifetime.
    pub targets_released: u64,
    /// Targets currently alive.
    pub live_targets: usize,
    /// Bytes held by live targets.
    pub live_bytes: usize,
    /// Creations per target label.
    pub created_by_label: BTreeMap<&'static str, u64>,
    /// Releases per target label.
    pub released_by_label: BTreeMap<&'static str, u64>,
    /// Scene renders executed.
    pub scene_renders: u64,
    /// Full-screen passes executed.
    pub fullscreen_passes: u64,
    /// Context rebuilds executed.
    pub context_rebuilds: u64,
    /// Targets that were still alive when the context was rebuilt.
    pub leaked_on_rebuild: u64,
}

impl RendererStats {
    /// Creations recorded for `label`.
    pub fn created(&self, label: &str) -> u64 {
        self.created_by_label.get(label).copied().unwrap_or(0)
    }

    /// Releases recorded for `label`.
    pub fn released(&self, label: &str) -> u64 {
        self.released_by_label.get(label).copied().unwrap_or(0)
    }
}

/// The renderer contract the pipeline consumes.
///
/// Work submitted through one renderer completes in submission order as observed by later
/// calls, so a pass always sees the finished output of every earlier pass.
pub trait Renderer {
    /// Current context description.
    fn context(&self) -> ContextDesc;

    /// Tear down and recreate the graphics context. Off-screen targets do not survive.
    fn rebuild_context(&mut self, desc: ContextDesc) -> AfterimageResult<()>;

    /// Resize the display, keeping the sample count.
    fn resize_output(&mut self, extent: Extent) -> AfterimageResult<()>;

    /// Allocate an off-screen target.
    fn create_target(&mut self, desc: TargetDesc) -> AfterimageResult<TargetId>;

    /// Release an off-screen target.
    fn release_target(&mut self, id: TargetId) -> AfterimageResult<()>;

    /// Declaration of a live target.
    fn target_desc(&self, id: TargetId) -> Option<TargetDesc>;

    /// Draw `scene` as seen by `camera` into `target`, clearing it first.
    fn render(
        &mut self,
        scene: &dyn Scene,
        camera: &Camera,
        target: RenderTarget,
        shading: Shading<'_>,
    ) -> AfterimageResult<()>;

    /// Execute a full-screen pass.
    fn fullscreen_pass(&mut self, pass: FullscreenPass<'_>) -> AfterimageResult<()>;

    /// Read back a target (the display is resolved to one sample per pixel).
    fn read_pixels(&self, target: RenderTarget) -> AfterimageResult<ColorImage>;

    /// Allocation and work counters.
    fn stats(&self) -> RendererStats;

    /// Display dimensions.
    fn output_extent(&self) -> Extent {
        self.context().extent
    }
}
