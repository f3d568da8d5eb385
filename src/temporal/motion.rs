use std::collections::HashMap;

use crate::foundation::core::{FrameIndex, Mat4, Rgba, Vec3};
use crate::foundation::error::AfterimageResult;
use crate::foundation::math::clip_to_ndc;
use crate::render::backend::{
    Fragment, RenderTarget, Renderer, Shading, ShadingOverride, SurfaceProgram,
};
use crate::scene::camera::Camera;
use crate::scene::graph::{DrawItem, ObjectId, Scene};
use crate::temporal::history::TransformHistoryTracker;

/// Encode an NDC displacement into the `[0, 1]` motion-buffer range: `(s·d + 2) / 4`.
///
/// Displacements are bounded by `[-2, 2]` per axis, so with `scale == 1` the encoded value never
/// leaves `[0, 1]`. Zero motion encodes to the midpoint `0.5`.
pub fn encode_motion(delta: Vec3, scale: f32) -> Rgba {
    ((delta * scale + Vec3::splat(2.0)) / 4.0).extend(1.0)
}

/// Inverse of [`encode_motion`].
pub fn decode_motion(texel: Rgba, scale: f32) -> Vec3 {
    (texel.truncate() * 4.0 - Vec3::splat(2.0)) / scale
}

/// Per-object motion program: current and previous model-view-projection matrices.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionProgram {
    current: Mat4,
    previous: Mat4,
    scale: f32,
}

impl MotionProgram {
    fn displacement(&self, object_pos: Vec3) -> Vec3 {
        let p = object_pos.extend(1.0);
        match (clip_to_ndc(self.current * p), clip_to_ndc(self.previous * p)) {
            (Some(cur), Some(prev)) => cur - prev,
            _ => Vec3::ZERO,
        }
    }
}

impl SurfaceProgram for MotionProgram {
    fn shade(&self, frag: &Fragment) -> Rgba {
        encode_motion(self.displacement(frag.object_pos), self.scale)
    }
}

#[derive(Debug, Default)]
struct ProgramCache {
    programs: HashMap<ObjectId, MotionProgram>,
    generation: Option<u64>,
    created: u64,
}

impl ProgramCache {
    fn sweep(&mut self, scene: &dyn Scene) {
        let generation = scene.membership_generation();
        if self.generation == Some(generation) {
            return;
        }
        let before = self.programs.len();
        self.programs.retain(|id, _| scene.contains(*id));
        let dropped = before - self.programs.len();
        if dropped > 0 {
            tracing::debug!(dropped, "motion programs swept after scene membership change");
        }
        self.generation = Some(generation);
    }
}

impl ShadingOverride for ProgramCache {
    fn program_for(&self, id: ObjectId) -> Option<&dyn SurfaceProgram> {
        self.programs.get(&id).map(|p| p as &dyn SurfaceProgram)
    }

    fn clear_color(&self) -> Option<Rgba> {
        Some(encode_motion(Vec3::ZERO, 1.0))
    }
}

/// Renders per-pixel screen-space motion of every drawable into a float target.
#[derive(Debug)]
pub struct MotionVectorPass {
    tracker: TransformHistoryTracker,
    cache: ProgramCache,
    scale: f32,
}

impl MotionVectorPass {
    /// Pass encoding displacements with `scale`.
    pub fn new(scale: f32) -> Self {
        Self {
            tracker: TransformHistoryTracker::new(),
            cache: ProgramCache::default(),
            scale,
        }
    }

    /// Draw the motion buffer for the current state of `scene` into `target`.
    ///
    /// Coverage follows `camera` as presented; motion values are computed from un-jittered
    /// projections against the previously captured snapshot.
    pub fn render(
        &mut self,
        renderer: &mut dyn Renderer,
        scene: &dyn Scene,
        camera: &Camera,
        target: RenderTarget,
    ) -> AfterimageResult<()> {
        self.cache.sweep(scene);

        let view_proj = camera.unjittered_projection() * camera.view();
        let prev_view_proj = self.tracker.previous_view_projection(view_proj);
        let (tracker, cache, scale) = (&self.tracker, &mut self.cache, self.scale);
        scene.visit(&mut |item: DrawItem<'_>| {
            let program = MotionProgram {
                current: view_proj * item.world,
                previous: prev_view_proj * tracker.previous_world(item.id, item.world),
                scale,
            };
            match cache.programs.get_mut(&item.id) {
                Some(p) => *p = program,
                None => {
                    cache.programs.insert(item.id, program);
                    cache.created += 1;
                }
            }
        });

        renderer.render(scene, camera, target, Shading::Override(&self.cache))
    }

    /// Record this frame's transforms as the "previous" state for the next frame.
    ///
    /// Returns `false` when `frame` was already captured.
    pub fn capture_history(
        &mut self,
        frame: FrameIndex,
        scene: &dyn Scene,
        camera: &Camera,
    ) -> bool {
        self.tracker.capture(frame, scene, camera)
    }

    /// Forget the previous snapshot; the next motion buffer reads as static.
    pub fn reset_history(&mut self) {
        self.tracker.reset();
    }

    /// Transform history.
    pub fn tracker(&self) -> &TransformHistoryTracker {
        &self.tracker
    }

    /// Programs created since construction.
    pub fn programs_created(&self) -> u64 {
        self.cache.created
    }

    /// Programs currently cached.
    pub fn cached_programs(&self) -> usize {
        self.cache.programs.len()
    }

    /// Encoding scale.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Drop every cached program and the transform history.
    pub fn dispose(&mut self) {
        self.cache.programs.clear();
        self.cache.generation = None;
        self.tracker.reset();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/temporal/motion.rs"]
mod tests;
