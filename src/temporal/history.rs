use std::collections::HashMap;

use crate::foundation::core::{FrameIndex, Mat4};
use crate::scene::camera::Camera;
use crate::scene::graph::{DrawItem, ObjectId, Scene};

/// World transforms and camera matrices of one finished frame.
#[derive(Clone, Debug, PartialEq)]
pub struct TransformSnapshot {
    /// Frame the snapshot was captured after.
    pub frame: FrameIndex,
    /// World transform of every drawable visited.
    pub objects: HashMap<ObjectId, Mat4>,
    /// Camera view matrix.
    pub view: Mat4,
    /// Camera projection without jitter.
    pub projection: Mat4,
}

impl TransformSnapshot {
    /// Traverse `scene` and record every drawable's world transform.
    pub fn capture(frame: FrameIndex, scene: &dyn Scene, camera: &Camera) -> Self {
        let mut objects = HashMap::new();
        scene.visit(&mut |item: DrawItem<'_>| {
            objects.insert(item.id, item.world);
        });
        Self {
            frame,
            objects,
            view: camera.view(),
            projection: camera.unjittered_projection(),
        }
    }

    /// View-projection product.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

/// Keeps the previous frame's transforms for motion estimation.
#[derive(Clone, Debug, Default)]
pub struct TransformHistoryTracker {
    previous: Option<TransformSnapshot>,
}

impl TransformHistoryTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with the state of `frame`.
    ///
    /// Returns `false` (and keeps the existing snapshot) when `frame` was already captured.
    pub fn capture(&mut self, frame: FrameIndex, scene: &dyn Scene, camera: &Camera) -> bool {
        if self.previous.as_ref().is_some_and(|p| p.frame == frame) {
            tracing::trace!(frame = frame.0, "duplicate history capture ignored");
            return false;
        }
        self.previous = Some(TransformSnapshot::capture(frame, scene, camera));
        true
    }

    /// Last captured snapshot.
    pub fn previous(&self) -> Option<&TransformSnapshot> {
        self.previous.as_ref()
    }

    /// Previous world transform of `id`, falling back to `current` when unknown.
    pub fn previous_world(&self, id: ObjectId, current: Mat4) -> Mat4 {
        self.previous
            .as_ref()
            .and_then(|p| p.objects.get(&id).copied())
            .unwrap_or(current)
    }

    /// Previous view-projection, falling back to `current` when nothing was captured.
    pub fn previous_view_projection(&self, current: Mat4) -> Mat4 {
        self.previous
            .as_ref()
            .map_or(current, TransformSnapshot::view_projection)
    }

    /// Forget the snapshot.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/temporal/history.rs"]
mod tests;
