use smallvec::SmallVec;

use crate::foundation::core::{Extent, Rgba, UVec2, Vec2};
use crate::foundation::error::AfterimageResult;
use crate::render::backend::{FullscreenPass, RenderTarget, Renderer, TargetId};
use crate::render::image::ColorImage;

/// Extra inputs a full-screen program reads besides the pass source.
pub type Bindings = SmallVec<[TargetId; 4]>;

/// Images visible to a full-screen program while it runs.
pub struct PassInputs<'a> {
    source: &'a ColorImage,
    bound: SmallVec<[(TargetId, &'a ColorImage); 4]>,
    destination: Extent,
}

impl<'a> PassInputs<'a> {
    pub(crate) fn new(
        source: &'a ColorImage,
        bound: SmallVec<[(TargetId, &'a ColorImage); 4]>,
        destination: Extent,
    ) -> Self {
        Self {
            source,
            bound,
            destination,
        }
    }

    /// The pass source.
    pub fn source(&self) -> &'a ColorImage {
        self.source
    }

    /// A bound input, if the program declared it.
    pub fn bound(&self, id: TargetId) -> Option<&'a ColorImage> {
        self.bound.iter().find(|(b, _)| *b == id).map(|(_, img)| *img)
    }

    /// Dimensions of the pass destination.
    pub fn destination_extent(&self) -> Extent {
        self.destination
    }
}

/// Per-pixel program executed over a whole destination.
///
/// Programs run concurrently over rows and must not carry interior mutability.
pub trait FullscreenProgram: Sync {
    /// Debug label.
    fn label(&self) -> &'static str;

    /// Targets read in addition to the pass source.
    fn bindings(&self) -> Bindings {
        Bindings::new()
    }

    /// Output color of destination pixel `pixel`, whose center is at `uv`.
    fn shade(&self, inputs: &PassInputs<'_>, pixel: UVec2, uv: Vec2) -> Rgba;
}

/// Plain copy; bilinear resample when source and destination extents differ.
#[derive(Clone, Copy, Debug, Default)]
pub struct CopyProgram;

impl FullscreenProgram for CopyProgram {
    fn label(&self) -> &'static str {
        "copy"
    }

    fn shade(&self, inputs: &PassInputs<'_>, pixel: UVec2, uv: Vec2) -> Rgba {
        let src = inputs.source();
        if src.extent() == inputs.destination_extent() {
            return src.texel(i64::from(pixel.x), i64::from(pixel.y));
        }
        src.sample_bilinear(uv)
    }
}

/// Full-screen textured-quad copy from one color target into another or onto the display.
#[derive(Clone, Copy, Debug, Default)]
pub struct Blitter;

impl Blitter {
    /// Write `destination` from `source`, through `program` when given, otherwise as a copy.
    pub fn copy(
        renderer: &mut dyn Renderer,
        source: TargetId,
        destination: RenderTarget,
        program: Option<&dyn FullscreenProgram>,
    ) -> AfterimageResult<()> {
        renderer.fullscreen_pass(FullscreenPass {
            source,
            destination,
            program: program.unwrap_or(&CopyProgram),
        })
    }
}
