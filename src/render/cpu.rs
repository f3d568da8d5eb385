use std::collections::HashMap;

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::foundation::core::{Extent, Mat4, Rgba, UVec2, Vec2};
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::render::backend::{
    ContextDesc, FullscreenPass, PixelFormat, RenderTarget, Renderer, RendererStats, Shading,
    SurfaceProgram, TargetDesc, TargetId,
};
use crate::render::blit::{FullscreenProgram, PassInputs};
use crate::render::image::{ColorImage, quantize};
use crate::render::raster::{SampleBuffer, draw_triangle, sample_pattern};
use crate::scene::camera::Camera;
use crate::scene::graph::{DrawItem, Scene};

static SINGLE_SAMPLE: [Vec2; 1] = [Vec2::new(0.5, 0.5)];

/// Options for the CPU reference renderer.
#[derive(Debug, Clone, Copy)]
pub struct CpuRendererOpts {
    /// Maximum number of simultaneously live off-screen targets.
    pub max_live_targets: Option<usize>,
    /// Maximum bytes held by live off-screen targets.
    pub max_live_bytes: Option<usize>,
    /// Run full-screen passes across rows in parallel.
    pub parallel: bool,
}

impl Default for CpuRendererOpts {
    fn default() -> Self {
        Self {
            max_live_targets: None,
            max_live_bytes: None,
            parallel: true,
        }
    }
}

struct Offscreen {
    desc: TargetDesc,
    image: ColorImage,
}

/// Software renderer implementing [`Renderer`].
///
/// Off-screen targets are single-sampled images in their declared format. The display is an
/// `Rgba8Unorm` sample buffer with the context's sample count, resolved on readback.
pub struct CpuRenderer {
    opts: CpuRendererOpts,
    context: ContextDesc,
    display: SampleBuffer,
    targets: HashMap<TargetId, Offscreen>,
    next_target: u32,
    stats: RendererStats,
}

impl CpuRenderer {
    /// Create a renderer with a display described by `context`.
    pub fn new(context: ContextDesc, opts: CpuRendererOpts) -> AfterimageResult<Self> {
        let display = display_buffer(context)?;
        Ok(Self {
            opts,
            context,
            display,
            targets: HashMap::new(),
            next_target: 0,
            stats: RendererStats::default(),
        })
    }

    /// Change the allocation limits; existing targets are kept even if now over budget.
    pub fn set_opts(&mut self, opts: CpuRendererOpts) {
        self.opts = opts;
    }

    fn target(&self, id: TargetId) -> AfterimageResult<&Offscreen> {
        self.targets
            .get(&id)
            .ok_or_else(|| AfterimageError::resource(format!("unknown target {id:?}")))
    }

    fn check_budget(&self, desc: &TargetDesc) -> AfterimageResult<()> {
        if let Some(max) = self.opts.max_live_targets
            && self.targets.len() >= max
        {
            return Err(AfterimageError::resource(format!(
                "target budget exhausted ({max} live) allocating '{}'",
                desc.label
            )));
        }
        if let Some(max) = self.opts.max_live_bytes
            && self.stats.live_bytes.saturating_add(desc.byte_len()) > max
        {
            return Err(AfterimageError::resource(format!(
                "byte budget exhausted ({max}) allocating '{}'",
                desc.label
            )));
        }
        Ok(())
    }
}

fn display_buffer(context: ContextDesc) -> AfterimageResult<SampleBuffer> {
    if context.extent.is_empty() {
        return Err(AfterimageError::resource("display extent must be non-empty"));
    }
    let pattern = sample_pattern(context.samples).ok_or_else(|| {
        AfterimageError::resource(format!(
            "unsupported display sample count {}",
            context.samples
        ))
    })?;
    Ok(SampleBuffer::new(
        context.extent,
        PixelFormat::Rgba8Unorm,
        pattern,
    ))
}

fn draw_scene(
    buf: &mut SampleBuffer,
    scene: &dyn Scene,
    camera: &Camera,
    shading: Shading<'_>,
) -> AfterimageResult<()> {
    let clear = match shading {
        Shading::Override(o) => o.clear_color().unwrap_or_else(|| scene.background()),
        Shading::Materials => scene.background(),
    };
    buf.clear(clear);
    let view_proj = camera.projection() * camera.view();
    let mut failed = None;
    scene.visit(&mut |item: DrawItem<'_>| {
        if failed.is_some() {
            return;
        }
        let program: &dyn SurfaceProgram = match shading {
            Shading::Materials => item.material,
            Shading::Override(o) => match o.program_for(item.id) {
                Some(p) => p,
                None => return,
            },
        };
        let mvp: Mat4 = view_proj * item.world;
        let positions = &item.mesh.positions;
        for tri in &item.mesh.triangles {
            let [Some(a), Some(b), Some(c)] = tri.map(|i| positions.get(i as usize).copied())
            else {
                failed = Some(AfterimageError::render(format!(
                    "object {:?} indexes past its {} positions",
                    item.id,
                    positions.len()
                )));
                return;
            };
            let object = [a, b, c];
            let clip = object.map(|p| mvp * p.extend(1.0));
            draw_triangle(buf, clip, object, program);
        }
    });
    failed.map_or(Ok(()), Err)
}

fn shade_rows(
    out: &mut [Rgba],
    extent: Extent,
    format: PixelFormat,
    inputs: &PassInputs<'_>,
    program: &dyn FullscreenProgram,
    parallel: bool,
) {
    let width = extent.width as usize;
    let texel = extent.texel_size();
    let shade_row = |(y, row): (usize, &mut [Rgba])| {
        for (x, px) in row.iter_mut().enumerate() {
            let uv = Vec2::new((x as f32 + 0.5) * texel.x, (y as f32 + 0.5) * texel.y);
            *px = quantize(
                format,
                program.shade(inputs, UVec2::new(x as u32, y as u32), uv),
            );
        }
    };
    if parallel {
        out.par_chunks_mut(width).enumerate().for_each(shade_row);
    } else {
        out.chunks_mut(width).enumerate().for_each(shade_row);
    }
}

impl Renderer for CpuRenderer {
    fn context(&self) -> ContextDesc {
        self.context
    }

    fn rebuild_context(&mut self, desc: ContextDesc) -> AfterimageResult<()> {
        let display = display_buffer(desc)?;
        if !self.targets.is_empty() {
            tracing::warn!(
                live = self.targets.len(),
                "context rebuilt with live off-screen targets; they are lost"
            );
            self.stats.leaked_on_rebuild += self.targets.len() as u64;
            self.targets.clear();
            self.stats.live_targets = 0;
            self.stats.live_bytes = 0;
        }
        tracing::debug!(
            width = desc.extent.width,
            height = desc.extent.height,
            samples = desc.samples,
            "rebuilt graphics context"
        );
        self.context = desc;
        self.display = display;
        self.stats.context_rebuilds += 1;
        Ok(())
    }

    fn resize_output(&mut self, extent: Extent) -> AfterimageResult<()> {
        let desc = ContextDesc {
            extent,
            samples: self.context.samples,
        };
        self.display = display_buffer(desc)?;
        self.context = desc;
        Ok(())
    }

    fn create_target(&mut self, desc: TargetDesc) -> AfterimageResult<TargetId> {
        if desc.extent.is_empty() {
            return Err(AfterimageError::resource(format!(
                "target '{}' must have a non-empty extent",
                desc.label
            )));
        }
        self.check_budget(&desc)?;
        let image = ColorImage::new(desc.extent, desc.format, Rgba::ZERO)?;

        let id = TargetId(self.next_target);
        self.next_target = self
            .next_target
            .checked_add(1)
            .ok_or_else(|| AfterimageError::resource("target id space exhausted"))?;

        self.stats.targets_created += 1;
        self.stats.live_targets += 1;
        self.stats.live_bytes = self.stats.live_bytes.saturating_add(desc.byte_len());
        *self.stats.created_by_label.entry(desc.label).or_default() += 1;

        self.targets.insert(id, Offscreen { desc, image });
        Ok(id)
    }

    fn release_target(&mut self, id: TargetId) -> AfterimageResult<()> {
        let t = self.targets.remove(&id).ok_or_else(|| {
            AfterimageError::resource(format!("release of unknown target {id:?}"))
        })?;
        self.stats.targets_released += 1;
        self.stats.live_targets = self.stats.live_targets.saturating_sub(1);
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(t.desc.byte_len());
        *self.stats.released_by_label.entry(t.desc.label).or_default() += 1;
        Ok(())
    }

    fn target_desc(&self, id: TargetId) -> Option<TargetDesc> {
        self.targets.get(&id).map(|t| t.desc.clone())
    }

    fn render(
        &mut self,
        scene: &dyn Scene,
        camera: &Camera,
        target: RenderTarget,
        shading: Shading<'_>,
    ) -> AfterimageResult<()> {
        match target {
            RenderTarget::Display => draw_scene(&mut self.display, scene, camera, shading)?,
            RenderTarget::Offscreen(id) => {
                let (extent, format) = {
                    let t = self.target(id)?;
                    (t.desc.extent, t.desc.format)
                };
                let mut buf = SampleBuffer::new(extent, format, &SINGLE_SAMPLE);
                draw_scene(&mut buf, scene, camera, shading)?;
                let image = ColorImage::from_texels(extent, format, buf.color)?;
                if let Some(t) = self.targets.get_mut(&id) {
                    t.image = image;
                }
            }
        }
        self.stats.scene_renders += 1;
        Ok(())
    }

    fn fullscreen_pass(&mut self, pass: FullscreenPass<'_>) -> AfterimageResult<()> {
        let bindings = pass.program.bindings();
        if let RenderTarget::Offscreen(dst) = pass.destination {
            if dst == pass.source || bindings.contains(&dst) {
                return Err(AfterimageError::render(format!(
                    "pass '{}' reads and writes target {dst:?}",
                    pass.program.label()
                )));
            }
            self.target(dst)?;
        }
        self.target(pass.source)?;
        for b in &bindings {
            self.target(*b)?;
        }

        match pass.destination {
            RenderTarget::Display => {
                let extent = self.context.extent;
                let mut resolved = vec![Rgba::ZERO; extent.texel_count()];
                {
                    let source = &self.target(pass.source)?.image;
                    let bound: SmallVec<[(TargetId, &ColorImage); 4]> = bindings
                        .iter()
                        .filter_map(|b| self.targets.get(b).map(|t| (*b, &t.image)))
                        .collect();
                    let inputs = PassInputs::new(source, bound, extent);
                    shade_rows(
                        &mut resolved,
                        extent,
                        PixelFormat::Rgba8Unorm,
                        &inputs,
                        pass.program,
                        self.opts.parallel,
                    );
                }
                let spp = self.display.samples.len();
                for (px, color) in self.display.color.chunks_exact_mut(spp).zip(resolved) {
                    px.fill(color);
                }
                self.display.depth.fill(1.0);
            }
            RenderTarget::Offscreen(dst) => {
                let Some(mut out) = self.targets.remove(&dst) else {
                    return Err(AfterimageError::resource(format!("unknown target {dst:?}")));
                };
                let extent = out.desc.extent;
                let format = out.desc.format;
                if let Some(src) = self.targets.get(&pass.source) {
                    let source = &src.image;
                    let bound: SmallVec<[(TargetId, &ColorImage); 4]> = bindings
                        .iter()
                        .filter_map(|b| self.targets.get(b).map(|t| (*b, &t.image)))
                        .collect();
                    let inputs = PassInputs::new(source, bound, extent);
                    shade_rows(
                        out.image.texels_mut(),
                        extent,
                        format,
                        &inputs,
                        pass.program,
                        self.opts.parallel,
                    );
                }
                self.targets.insert(dst, out);
            }
        }
        self.stats.fullscreen_passes += 1;
        Ok(())
    }

    fn read_pixels(&self, target: RenderTarget) -> AfterimageResult<ColorImage> {
        match target {
            RenderTarget::Display => ColorImage::from_texels(
                self.context.extent,
                PixelFormat::Rgba8Unorm,
                self.display.resolve(),
            ),
            RenderTarget::Offscreen(id) => Ok(self.target(id)?.image.clone()),
        }
    }

    fn stats(&self) -> RendererStats {
        self.stats.clone()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
