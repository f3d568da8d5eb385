use std::time::Duration;

use crate::config::PipelineConfig;
use crate::foundation::core::{Extent, FrameIndex};
use crate::foundation::error::{AfterimageError, AfterimageResult};
use crate::frame::hooks::{HookHandle, HookList};
use crate::frame::host::{FrameClock, PresentationHost};
use crate::frame::mode::{AaMode, AaStrategy, build_strategy};
use crate::render::backend::{ContextDesc, Renderer};
use crate::scene::camera::Camera;
use crate::scene::graph::Scene;

/// Scene and camera driven by the scheduler; hooks receive it by reference.
#[derive(Clone, Debug)]
pub struct Stage<S> {
    /// Scene content.
    pub scene: S,
    /// Viewing camera.
    pub camera: Camera,
}

impl<S> Stage<S> {
    /// Bundle a scene and a camera.
    pub fn new(scene: S, camera: Camera) -> Self {
        Self { scene, camera }
    }
}

/// Hook run before rendering, with the time elapsed since the previous iteration.
pub type PreRenderHook<S> = dyn FnMut(&mut Stage<S>, Duration) -> AfterimageResult<()>;
/// Hook run after rendering.
pub type PostRenderHook<S> = dyn FnMut(&Stage<S>) -> AfterimageResult<()>;

/// Origin of a [`Diagnostic`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A pre-render hook failed.
    PreRenderHook,
    /// A post-render hook failed.
    PostRenderHook,
    /// `set_mode_by_name` received an unknown name.
    UnknownMode,
}

/// Non-fatal problem surfaced to the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// Frame during which it happened, if any.
    pub frame: Option<FrameIndex>,
    /// Origin.
    pub kind: DiagnosticKind,
    /// Human-readable description.
    pub message: String,
}

/// Outcome of one scheduler iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Index of the frame just presented.
    pub frame: FrameIndex,
    /// Time since the previous iteration (zero for the first).
    pub delta: Duration,
    /// Mode that rendered the frame.
    pub mode: AaMode,
    /// Problems recorded during the frame.
    pub diagnostics: Vec<Diagnostic>,
}

/// Frame loop owner: hook lists, the active antialiasing strategy and the renderer.
///
/// The scheduler never blocks between frames. Every iteration ends by asking the presentation
/// host for another one; the host calls [`FrameScheduler::tick`] when it is due.
pub struct FrameScheduler<S: Scene + 'static> {
    config: PipelineConfig,
    renderer: Box<dyn Renderer>,
    stage: Stage<S>,
    mode: AaMode,
    strategy: Box<dyn AaStrategy>,
    pre: HookList<PreRenderHook<S>>,
    post: HookList<PostRenderHook<S>>,
    clock: Box<dyn FrameClock>,
    last_tick: Option<Duration>,
    frame: FrameIndex,
    running: bool,
    pending_resize: Option<Extent>,
    diagnostics: Vec<Diagnostic>,
}

impl<S: Scene + 'static> FrameScheduler<S> {
    /// Scheduler rendering `stage` through `renderer`, starting in `config.mode`.
    ///
    /// The renderer context is rebuilt if its sample count does not suit the initial mode.
    pub fn new(
        config: PipelineConfig,
        renderer: Box<dyn Renderer>,
        stage: Stage<S>,
        clock: Box<dyn FrameClock>,
    ) -> AfterimageResult<Self> {
        config.validate()?;
        let mut scheduler = Self {
            config,
            renderer,
            stage,
            mode: AaMode::None,
            strategy: build_strategy(AaMode::None, &PipelineConfig::default())?,
            pre: HookList::default(),
            post: HookList::default(),
            clock,
            last_tick: None,
            frame: FrameIndex(0),
            running: false,
            pending_resize: None,
            diagnostics: Vec::new(),
        };
        let wanted = scheduler.samples_for(AaMode::None);
        if scheduler.renderer.context().samples != wanted {
            scheduler.rebuild_context(wanted)?;
        }
        scheduler.set_mode(scheduler.config.mode)?;
        Ok(scheduler)
    }

    fn samples_for(&self, mode: AaMode) -> u32 {
        if mode.needs_multisample() {
            self.config.msaa_samples
        } else {
            1
        }
    }

    fn rebuild_context(&mut self, samples: u32) -> AfterimageResult<()> {
        let extent = self.renderer.output_extent();
        self.renderer.rebuild_context(ContextDesc { extent, samples })
    }

    /// Register a pre-render hook; the newest hook runs first.
    pub fn on_pre_render<F>(&mut self, hook: F) -> HookHandle
    where
        F: FnMut(&mut Stage<S>, Duration) -> AfterimageResult<()> + 'static,
    {
        self.pre.register(Box::new(hook))
    }

    /// Register a post-render hook; the newest hook runs first.
    pub fn on_post_render<F>(&mut self, hook: F) -> HookHandle
    where
        F: FnMut(&Stage<S>) -> AfterimageResult<()> + 'static,
    {
        self.post.register(Box::new(hook))
    }

    /// Switch the antialiasing strategy.
    ///
    /// The previous strategy is disposed before the new one is built. The graphics context is
    /// rebuilt only when the old or the new mode needs a multisampled display. If the switch
    /// fails the scheduler is left in [`AaMode::None`] and the error is returned.
    #[tracing::instrument(level = "debug", skip(self), fields(from = %self.mode))]
    pub fn set_mode(&mut self, mode: AaMode) -> AfterimageResult<()> {
        if mode == self.mode {
            return Ok(());
        }
        let old = self.mode;

        let disposed = self.strategy.dispose(self.renderer.as_mut());
        self.strategy = build_strategy(AaMode::None, &self.config)?;
        self.mode = AaMode::None;
        disposed?;

        if old.needs_multisample() || mode.needs_multisample() {
            self.rebuild_context(self.samples_for(mode))?;
        }

        let mut strategy = build_strategy(mode, &self.config)?;
        if let Err(e) = strategy.activate(self.renderer.as_mut()) {
            if let Err(cleanup) = strategy.dispose(self.renderer.as_mut()) {
                tracing::warn!(error = %cleanup, "cleanup after failed activation also failed");
            }
            tracing::warn!(%mode, error = %e, "mode activation failed; falling back to none");
            if mode.needs_multisample() {
                self.rebuild_context(1)?;
            }
            return Err(e);
        }

        tracing::debug!(%old, new = %mode, "antialiasing mode switched");
        self.strategy = strategy;
        self.mode = mode;
        Ok(())
    }

    /// Switch mode by name. Unknown names are recorded as diagnostics and change nothing.
    pub fn set_mode_by_name(&mut self, name: &str) -> AfterimageResult<()> {
        match name.parse::<AaMode>() {
            Ok(mode) => self.set_mode(mode),
            Err(e) => {
                tracing::warn!(name, "ignoring unrecognized antialiasing mode");
                self.diagnostics.push(Diagnostic {
                    frame: None,
                    kind: DiagnosticKind::UnknownMode,
                    message: e.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Begin the loop. Calling it while running does nothing.
    pub fn start(&mut self, host: &mut dyn PresentationHost) {
        if self.running {
            return;
        }
        self.running = true;
        host.request_frame();
    }

    /// Halt the loop; the next tick does nothing.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Queue an output resize, applied at the start of the next iteration.
    pub fn resize(&mut self, extent: Extent) {
        self.pending_resize = Some(extent);
    }

    /// Run one iteration and request the next one from `host`.
    ///
    /// Returns `Ok(None)` when the scheduler is not running. A render failure stops the loop and
    /// is returned; hook failures are reported in the frame's diagnostics instead.
    pub fn tick(
        &mut self,
        host: &mut dyn PresentationHost,
    ) -> AfterimageResult<Option<FrameReport>> {
        if !self.running {
            return Ok(None);
        }
        let now = self.clock.now();
        let delta = self
            .last_tick
            .map_or(Duration::ZERO, |last| now.saturating_sub(last));
        self.last_tick = Some(now);
        let frame = self.frame;
        let mut diagnostics = Vec::new();

        if let Some(extent) = self.pending_resize.take()
            && let Err(e) = self.apply_resize(extent)
        {
            self.running = false;
            return Err(e);
        }

        let stage = &mut self.stage;
        if let Err(e) = self.pre.run(|hook| hook(&mut *stage, delta)) {
            diagnostics.push(hook_diagnostic(frame, DiagnosticKind::PreRenderHook, &e));
        }

        if let Err(e) = self.strategy.render(
            self.renderer.as_mut(),
            &self.stage.scene,
            &mut self.stage.camera,
        ) {
            tracing::warn!(
                frame = frame.0,
                mode = %self.mode,
                error = %e,
                "render failed; stopping"
            );
            self.running = false;
            return Err(e);
        }
        self.strategy
            .finish_frame(frame, &self.stage.scene, &self.stage.camera);

        let stage = &self.stage;
        if let Err(e) = self.post.run(|hook| hook(stage)) {
            diagnostics.push(hook_diagnostic(frame, DiagnosticKind::PostRenderHook, &e));
        }

        self.diagnostics.extend(diagnostics.iter().cloned());
        self.frame = frame.next();
        host.request_frame();
        Ok(Some(FrameReport {
            frame,
            delta,
            mode: self.mode,
            diagnostics,
        }))
    }

    fn apply_resize(&mut self, extent: Extent) -> AfterimageResult<()> {
        if extent == self.renderer.output_extent() {
            return Ok(());
        }
        tracing::debug!(width = extent.width, height = extent.height, "applying resize");
        self.renderer.resize_output(extent)?;
        self.stage.camera.set_aspect(extent.aspect())?;
        self.config.width = extent.width;
        self.config.height = extent.height;
        self.strategy.resize(self.renderer.as_mut())
    }

    /// Release the active strategy's resources and drop every hook.
    pub fn dispose(&mut self) -> AfterimageResult<()> {
        self.running = false;
        self.pre.clear();
        self.post.clear();
        let disposed = self.strategy.dispose(self.renderer.as_mut());
        self.strategy = build_strategy(AaMode::None, &self.config)?;
        self.mode = AaMode::None;
        disposed
    }

    /// Drain diagnostics recorded since the last call.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Active mode.
    pub fn mode(&self) -> AaMode {
        self.mode
    }

    /// Index of the next frame.
    pub fn frame(&self) -> FrameIndex {
        self.frame
    }

    /// Return `true` between `start` and `stop`.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Scene and camera.
    pub fn stage(&self) -> &Stage<S> {
        &self.stage
    }

    /// Scene and camera, mutably (between frames).
    pub fn stage_mut(&mut self) -> &mut Stage<S> {
        &mut self.stage
    }

    /// The renderer.
    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    /// Live pre-render hooks.
    pub fn pre_render_hooks(&self) -> usize {
        self.pre.len()
    }

    /// Live post-render hooks.
    pub fn post_render_hooks(&self) -> usize {
        self.post.len()
    }

    /// Configuration in use (extent follows applied resizes).
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

fn hook_diagnostic(frame: FrameIndex, kind: DiagnosticKind, err: &AfterimageError) -> Diagnostic {
    tracing::warn!(frame = frame.0, ?kind, error = %err, "hook failed; remaining hooks skipped");
    Diagnostic {
        frame: Some(frame),
        kind,
        message: err.to_string(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/frame/scheduler.rs"]
mod tests;
