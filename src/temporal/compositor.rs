use crate::config::TaaConfig;
use crate::foundation::core::{Extent, FrameIndex};
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::render::backend::{RenderTarget, Renderer, Shading, TargetDesc, TargetId};
use crate::render::blit::Blitter;
use crate::scene::camera::Camera;
use crate::scene::graph::Scene;
use crate::temporal::jitter::JitterSequencer;
use crate::temporal::motion::MotionVectorPass;
use crate::temporal::resolve::ResolveProgram;

/// Label of the jittered color target.
pub const READ_LABEL: &str = "taa-read";
/// Label of the resolve output target.
pub const WRITE_LABEL: &str = "taa-write";
/// Label of the history target.
pub const HISTORY_LABEL: &str = "taa-history";
/// Label of the motion target.
pub const MOTION_LABEL: &str = "taa-motion";

/// Accumulation state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositorState {
    /// History is not yet representative; the next frame bootstraps it.
    Cold,
    /// History holds an accumulated, displayable image.
    Warm,
}

/// Work counters of a compositor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompositorStats {
    /// Color renders of the scene (motion renders excluded).
    pub internal_renders: u64,
    /// Resolve iterations executed.
    pub composites: u64,
    /// Frames written to the display.
    pub displayed_frames: u64,
    /// Completed bootstraps.
    pub bootstraps: u64,
}

#[derive(Clone, Copy, Debug)]
struct TaaTargets {
    extent: Extent,
    read: TargetId,
    write: TargetId,
    history: TargetId,
    motion: TargetId,
}

impl TaaTargets {
    fn ids(&self) -> [TargetId; 4] {
        [self.read, self.write, self.history, self.motion]
    }
}

/// Temporal accumulation of jittered frames with motion-compensated history.
///
/// A cold compositor bootstraps on its next frame: one un-jittered render seeds the history, then
/// `period - 1` full composite iterations run before the history is shown. Afterwards every frame
/// is one jittered render, one motion render, one resolve and two copies.
#[derive(Debug)]
pub struct ReprojectionCompositor {
    config: TaaConfig,
    jitter: JitterSequencer,
    motion: MotionVectorPass,
    targets: Option<TaaTargets>,
    state: CompositorState,
    history_defined: bool,
    stats: CompositorStats,
}

impl ReprojectionCompositor {
    /// Compositor with validated parameters; no targets are allocated yet.
    pub fn new(config: TaaConfig) -> AfterimageResult<Self> {
        config.validate()?;
        Ok(Self {
            jitter: JitterSequencer::new(config.jitter_period)?,
            motion: MotionVectorPass::new(config.motion_scale),
            config,
            targets: None,
            state: CompositorState::Cold,
            history_defined: false,
            stats: CompositorStats::default(),
        })
    }

    /// Allocate every target at the renderer's output extent.
    ///
    /// Targets already matching the extent are kept; mismatching ones are replaced and the
    /// compositor goes cold.
    pub fn activate(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        let extent = renderer.output_extent();
        if self.targets.is_some_and(|t| t.extent == extent) {
            return Ok(());
        }
        self.release_targets(renderer)?;

        let color = self.config.history_format;
        let specs = [
            (READ_LABEL, color),
            (WRITE_LABEL, color),
            (HISTORY_LABEL, color),
            (MOTION_LABEL, self.config.motion_format),
        ];
        let mut made: Vec<TargetId> = Vec::with_capacity(specs.len());
        for (label, format) in specs {
            match renderer.create_target(TargetDesc {
                label,
                extent,
                format,
            }) {
                Ok(id) => made.push(id),
                Err(e) => {
                    for id in made {
                        if let Err(release) = renderer.release_target(id) {
                            tracing::warn!(?id, error = %release, "failed to roll back target");
                        }
                    }
                    return Err(e);
                }
            }
        }

        tracing::debug!(
            width = extent.width,
            height = extent.height,
            "allocated temporal targets"
        );
        self.targets = Some(TaaTargets {
            extent,
            read: made[0],
            write: made[1],
            history: made[2],
            motion: made[3],
        });
        self.go_cold();
        Ok(())
    }

    /// Reallocate for a new output extent (no-op when unchanged).
    pub fn resize(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        self.activate(renderer)
    }

    /// Produce one displayed frame of `scene`.
    ///
    /// `camera` is jittered for the duration of the jittered render and motion pass only; it is
    /// always returned un-jittered, including on error.
    #[tracing::instrument(level = "trace", skip_all, fields(state = ?self.state))]
    pub fn render_frame(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
    ) -> AfterimageResult<()> {
        self.activate(renderer)?;
        let t = self.targets()?;

        if self.state == CompositorState::Cold {
            return self.bootstrap(renderer, scene, camera, t);
        }

        self.composite(renderer, scene, camera, t)?;
        Blitter::copy(renderer, t.write, RenderTarget::Display, None)?;
        self.stats.displayed_frames += 1;
        Ok(())
    }

    /// Record the frame's transforms for the next frame's motion vectors.
    pub fn capture_history(
        &mut self,
        frame: FrameIndex,
        scene: &dyn Scene,
        camera: &Camera,
    ) -> bool {
        self.motion.capture_history(frame, scene, camera)
    }

    fn bootstrap(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
        t: TaaTargets,
    ) -> AfterimageResult<()> {
        tracing::debug!(period = self.jitter.period(), "bootstrapping temporal history");
        camera.clear_jitter();
        self.jitter.reset();

        renderer.render(scene, camera, RenderTarget::Offscreen(t.history), Shading::Materials)?;
        self.stats.internal_renders += 1;
        self.history_defined = true;
        self.motion.reset_history();

        for _ in 1..self.jitter.period() {
            self.composite(renderer, scene, camera, t)?;
        }

        self.state = CompositorState::Warm;
        self.stats.bootstraps += 1;
        Blitter::copy(renderer, t.history, RenderTarget::Display, None)?;
        self.stats.displayed_frames += 1;
        Ok(())
    }

    /// One jittered render, motion pass, resolve into `write` and copy back into `history`.
    fn composite(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &mut Camera,
        t: TaaTargets,
    ) -> AfterimageResult<()> {
        let sample = self.jitter.advance();
        camera.apply_jitter(sample * self.config.jitter_scale_px, t.extent);
        let drawn = self.render_jittered(renderer, scene, camera, t);
        camera.clear_jitter();
        drawn?;

        self.resolve(renderer, t)?;
        Blitter::copy(renderer, t.write, RenderTarget::Offscreen(t.history), None)?;
        self.stats.composites += 1;
        Ok(())
    }

    fn render_jittered(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &Camera,
        t: TaaTargets,
    ) -> AfterimageResult<()> {
        renderer.render(scene, camera, RenderTarget::Offscreen(t.read), Shading::Materials)?;
        self.stats.internal_renders += 1;
        self.motion
            .render(renderer, scene, camera, RenderTarget::Offscreen(t.motion))
    }

    fn resolve(&self, renderer: &mut dyn Renderer, t: TaaTargets) -> AfterimageResult<()> {
        if !self.history_defined {
            return Err(AfterimageError::render(
                "temporal resolve would read history that was never written",
            ));
        }
        let program = ResolveProgram {
            history: t.history,
            motion: t.motion,
            contrast_weight: self.config.contrast_weight,
            motion_scale: self.config.motion_scale,
        };
        Blitter::copy(
            renderer,
            t.read,
            RenderTarget::Offscreen(t.write),
            Some(&program),
        )
    }

    fn targets(&self) -> AfterimageResult<TaaTargets> {
        self.targets
            .ok_or_else(|| AfterimageError::resource("temporal targets are not allocated"))
    }

    fn go_cold(&mut self) {
        self.state = CompositorState::Cold;
        self.history_defined = false;
    }

    fn release_targets(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        let Some(t) = self.targets.take() else {
            return Ok(());
        };
        self.go_cold();
        let mut first_err = None;
        for id in t.ids() {
            if let Err(e) = renderer.release_target(id) {
                tracing::warn!(?id, error = %e, "failed to release temporal target");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Release every target, the motion program cache and the transform history.
    ///
    /// Safe before the first frame and safe to repeat.
    pub fn dispose(&mut self, renderer: &mut dyn Renderer) -> AfterimageResult<()> {
        let released = self.release_targets(renderer);
        self.motion.dispose();
        self.jitter.reset();
        released
    }

    /// Accumulation state.
    pub fn state(&self) -> CompositorState {
        self.state
    }

    /// Work counters.
    pub fn stats(&self) -> CompositorStats {
        self.stats
    }

    /// Jitter sequencer driving the sub-pixel offsets.
    pub fn jitter(&self) -> &JitterSequencer {
        &self.jitter
    }

    /// Motion vector pass.
    pub fn motion(&self) -> &MotionVectorPass {
        &self.motion
    }

    /// History target, while allocated.
    pub fn history_target(&self) -> Option<TargetId> {
        self.targets.map(|t| t.history)
    }

    /// Motion target, while allocated.
    pub fn motion_target(&self) -> Option<TargetId> {
        self.targets.map(|t| t.motion)
    }

    /// Parameters in use.
    pub fn config(&self) -> &TaaConfig {
        &self.config
    }
}

#[cfg(test)]
#[path = "../../tests/unit/temporal/compositor.rs"]
mod tests;
