use std::fmt;
use std::str::FromStr;

use crate::config::PipelineConfig;
use crate::foundation::core::{Extent, FrameIndex, Rgba, UVec2, Vec2};
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::render::backend::{
    PixelFormat, RenderTarget, Renderer, Shading, TargetDesc, TargetId,
};
use crate::render::blit::{Bindings, Blitter, FullscreenProgram, PassInputs};
use crate::scene::camera::Camera;
use crate::scene::graph::Scene;
use crate::temporal::compositor::ReprojectionCompositor;
use crate::temporal::jitter;
use crate::temporal::motion::MotionVectorPass;

/// Antialiasing mode selectable at frame granularity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AaMode {
    /// Render straight to the display.
    None,
    /// Multisampled display surface.
    Msaa,
    /// Several jittered renders of the same frame averaged together.
    #[serde(alias = "ssaa")]
    Supersampled,
    /// Temporal accumulation with motion-compensated history.
    #[default]
    #[serde(alias = "taa")]
    Temporal,
    /// Show the encoded motion buffer.
    #[serde(alias = "motion")]
    MotionVisualization,
}

impl AaMode {
    /// Every mode, in declaration order.
    pub const ALL: [AaMode; 5] = [
        AaMode::None,
        AaMode::Msaa,
        AaMode::Supersampled,
        AaMode::Temporal,
        AaMode::MotionVisualization,
    ];

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Msaa => "msaa",
            Self::Supersampled => "supersampled",
            Self::Temporal => "temporal",
            Self::MotionVisualization => "motion_visualization",
        }
    }

    /// Return `true` when the mode renders into a multisampled display surface.
    pub fn needs_multisample(self) -> bool {
        matches!(self, Self::Msaa)
    }
}

impl fmt::Display for AaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AaMode {
    type Err = AfterimageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "msaa" => Ok(Self::Msaa),
            "supersampled" | "ssaa" => Ok(Self::Supersampled),
            "temporal" | "taa" => Ok(Self::Temporal),
            "motion_visualization" | "motion" => Ok(Self::MotionVisualization),
            other => Err(AfterimageError::config(format!(
                "unrecognized antialiasing mode '{other}'"
            ))),
        }
    }
}

/// One antialiasing technique: owns its targets and produces the displayed frame.
pub trait AaStrategy {
    /// Mode this strategy implements.
    fn mode(&self) -> AaMode;

    /// Allocate resources at the renderer's output extent.
    fn activate(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()>;

    /// Adapt to a changed output extent.
    fn resize(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.dispose(renderer)?;
        self.activate(renderer)
    }

    /// Produce the displayed frame.
    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> AfterimageResult<()>;

    /// Called once per frame after [`AaStrategy::render`], with the frame's final state.
    fn finish_frame(&mut self, _frame: FrameIndex, _scene: &dyn Scene, _camera: &Camera) {}

    /// Release every resource. Safe to repeat.
    fn dispose(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()>;
}

/// Construct the strategy for `mode`; resources are not allocated yet.
pub fn build_strategy(
    mode: AaMode,
    config: &PipelineConfig,
) -> AfterimageResult<Box<dyn AaStrategy>> {
    Ok(match mode {
        AaMode::None | AaMode::Msaa => Box::new(DirectStrategy { mode }),
        AaMode::Supersampled => Box::new(SupersampleStrategy::new(
            config.supersample_count,
            config.taa.jitter_scale_px,
        )),
        AaMode::Temporal => Box::new(TemporalStrategy {
            compositor: ReprojectionCompositor::new(config.taa.clone())?,
        }),
        AaMode::MotionVisualization => Box::new(MotionVisualizationStrategy {
            pass: MotionVectorPass::new(config.taa.motion_scale),
            format: config.taa.motion_format,
            target: None,
        }),
    })
}

/// Scene rendered straight to the display (plain or multisampled).
#[derive(Debug)]
pub struct DirectStrategy {
    mode: AaMode,
}

impl AaStrategy for DirectStrategy {
    fn mode(&self) -> AaMode {
        self.mode
    }

    fn activate(&mut self, _renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        Ok(())
    }

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> AfterimageResult<()> {
        renderer.render(scene, camera, RenderTarget::Display, Shading::Materials)
    }

    fn dispose(&mut self, _renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        Ok(())
    }
}

/// Running average: `lerp(previous, sample, weight)` where the sample is the pass source.
struct AccumulateProgram {
    previous: TargetId,
    weight: f32,
}

impl FullscreenProgram for AccumulateProgram {
    fn label(&self) -> &'static str {
        "ssaa-accumulate"
    }

    fn bindings(&self) -> Bindings {
        Bindings::from_slice(&[self.previous])
    }

    fn shade(&self, inputs: &PassInputs<'_>, pixel: UVec2, _uv: Vec2) -> Rgba {
        let (x, y) = (i64::from(pixel.x), i64::from(pixel.y));
        let sample = inputs.source().texel(x, y);
        match inputs.bound(self.previous) {
            Some(prev) => prev.texel(x, y).lerp(sample, self.weight),
            None => sample,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct SupersampleTargets {
    sample: TargetId,
    accum: [TargetId; 2],
}

/// Averages `count` jittered renders per frame through ping-pong accumulation targets.
#[derive(Debug)]
pub struct SupersampleStrategy {
    offsets: Vec<Vec2>,
    targets: Option<SupersampleTargets>,
}

impl SupersampleStrategy {
    fn new(count: usize, jitter_scale_px: f32) -> Self {
        let offsets = if count <= 1 {
            vec![Vec2::ZERO]
        } else {
            jitter::generate(count)
                .into_iter()
                .map(|s| s * jitter_scale_px)
                .collect()
        };
        Self {
            offsets,
            targets: None,
        }
    }

    /// Jittered renders per frame.
    pub fn sample_count(&self) -> usize {
        self.offsets.len()
    }

    fn release(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        let Some(t) = self.targets.take() else {
            return Ok(());
        };
        release_all(renderer, &[t.sample, t.accum[0], t.accum[1]])
    }
}

/// Release every id, reporting the first failure after all were attempted.
fn release_all(renderer: &mut dyn Renderer, ids: &[TargetId]) -> AfterimageResult<()> {
    let mut first_err = None;
    for &id in ids {
        if let Err(e) = renderer.release_target(id) {
            tracing::warn!(?id, error = %e, "failed to release supersample target");
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}

fn accumulation_desc(label: &'static str, extent: Extent) -> TargetDesc {
    TargetDesc {
        label,
        extent,
        format: PixelFormat::Rgba32Float,
    }
}

impl AaStrategy for SupersampleStrategy {
    fn mode(&self) -> AaMode {
        AaMode::Supersampled
    }

    fn activate(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        if self.targets.is_some() {
            return Ok(());
        }
        let extent = renderer.output_extent();
        let mut ids = [TargetId(0); 3];
        for (n, label) in ["ssaa-sample", "ssaa-accum", "ssaa-accum"].into_iter().enumerate() {
            match renderer.create_target(accumulation_desc(label, extent)) {
                Ok(id) => ids[n] = id,
                Err(e) => {
                    // Allocation error wins over any rollback failure.
                    let _ = release_all(renderer, &ids[..n]);
                    return Err(e);
                }
            }
        }
        let [sample, a, b] = ids;
        self.targets = Some(SupersampleTargets {
            sample,
            accum: [a, b],
        });
        Ok(())
    }

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> AfterimageResult<()> {
        let t = self
            .targets
            .ok_or_else(|| AfterimageError::resource("supersample targets are not allocated"))?;
        let extent = renderer.output_extent();

        for (i, offset) in self.offsets.iter().enumerate() {
            camera.apply_jitter(*offset, extent);
            let drawn = renderer.render(
                scene,
                camera,
                RenderTarget::Offscreen(t.sample),
                Shading::Materials,
            );
            camera.clear_jitter();
            drawn?;

            let dst = t.accum[i % 2];
            if i == 0 {
                Blitter::copy(renderer, t.sample, RenderTarget::Offscreen(dst), None)?;
            } else {
                let program = AccumulateProgram {
                    previous: t.accum[(i + 1) % 2],
                    weight: 1.0 / (i as f32 + 1.0),
                };
                Blitter::copy(renderer, t.sample, RenderTarget::Offscreen(dst), Some(&program))?;
            }
        }

        let last = t.accum[(self.offsets.len() - 1) % 2];
        Blitter::copy(renderer, last, RenderTarget::Display, None)
    }

    fn dispose(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.release(renderer)
    }
}

/// Temporal antialiasing through a [`ReprojectionCompositor`].
#[derive(Debug)]
pub struct TemporalStrategy {
    compositor: ReprojectionCompositor,
}

impl TemporalStrategy {
    /// The wrapped compositor.
    pub fn compositor(&self) -> &ReprojectionCompositor {
        &self.compositor
    }
}

impl AaStrategy for TemporalStrategy {
    fn mode(&self) -> AaMode {
        AaMode::Temporal
    }

    fn activate(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.compositor.activate(renderer)
    }

    fn resize(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.compositor.resize(renderer)
    }

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> AfterimageResult<()> {
        self.compositor.render_frame(renderer, scene, camera)
    }

    fn finish_frame(&mut self, frame: FrameIndex, scene: &dyn Scene, camera: &Camera) {
        self.compositor.capture_history(frame, scene, camera);
    }

    fn dispose(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.compositor.dispose(renderer)
    }
}

/// Displays the encoded motion buffer.
#[derive(Debug)]
pub struct MotionVisualizationStrategy {
    pass: MotionVectorPass,
    format: PixelFormat,
    target: Option<TargetId>,
}

impl AaStrategy for MotionVisualizationStrategy {
    fn mode(&self) -> AaMode {
        AaMode::MotionVisualization
    }

    fn activate(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        if self.target.is_none() {
            self.target = Some(renderer.create_target(TargetDesc {
                label: "motion-view",
                extent: renderer.output_extent(),
                format: self.format,
            })?);
        }
        Ok(())
    }

    fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> AfterimageResult<()> {
        let target = self
            .target
            .ok_or_else(|| AfterimageError::resource("motion target is not allocated"))?;
        self.pass
            .render(renderer, scene, camera, RenderTarget::Offscreen(target))?;
        Blitter::copy(renderer, target, RenderTarget::Display, None)
    }

    fn finish_frame(&mut self, frame: FrameIndex, scene: &dyn Scene, camera: &Camera) {
        self.pass.capture_history(frame, scene, camera);
    }

    fn dispose(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.pass.dispose();
        match self.target.take() {
            Some(id) => renderer.release_target(id),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/mode.rs"]
mod tests;
