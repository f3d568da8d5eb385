//! Afterimage is a temporal antialiasing pipeline.
//!
//! Frames are rendered with a sub-pixel camera jitter that cycles through a Halton(2, 3)
//! sequence, per-pixel motion is derived from frame-to-frame transform history, and the previous
//! result is reprojected onto the current frame, clamped to the local neighborhood and blended:
//!
//! - [`JitterSequencer`] produces the periodic sub-pixel offsets
//! - [`MotionVectorPass`] renders encoded screen-space motion
//! - [`ReprojectionCompositor`] owns the history and runs the resolve
//! - [`FrameScheduler`] sequences hooks, rendering and antialiasing-mode switches per frame
//!
//! The pipeline talks to its collaborators through the [`Scene`] and [`Renderer`] traits.
//! [`SceneGraph`] and [`CpuRenderer`] are small reference implementations of both.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Pipeline configuration.
pub mod config;
pub mod frame;
pub mod render;
pub mod scene;
pub mod temporal;

pub use crate::foundation::core::{Extent, FrameIndex, Mat4, Rgba, UVec2, Vec2, Vec3, Vec4, rgba};
pub use crate::foundation::error::{AfterimageError, AfterimageResult};

pub use crate::config::{PipelineConfig, TaaConfig};
pub use crate::frame::hooks::HookHandle;
pub use crate::frame::host::{
    FixedStepClock, FrameClock, ManualHost, MonotonicClock, PresentationHost,
};
pub use crate::frame::mode::{AaMode, AaStrategy};
pub use crate::frame::scheduler::{
    Diagnostic, DiagnosticKind, FrameReport, FrameScheduler, Stage,
};
pub use crate::render::backend::{
    ContextDesc, PixelFormat, RenderTarget, Renderer, RendererStats, TargetDesc, TargetId,
};
pub use crate::render::blit::{Blitter, FullscreenProgram};
pub use crate::render::cpu::{CpuRenderer, CpuRendererOpts};
pub use crate::render::image::ColorImage;
pub use crate::scene::camera::Camera;
pub use crate::scene::graph::{Node, ObjectId, Scene, SceneGraph};
pub use crate::scene::material::Material;
pub use crate::scene::mesh::Mesh;
pub use crate::temporal::compositor::{CompositorState, CompositorStats, ReprojectionCompositor};
pub use crate::temporal::jitter::JitterSequencer;
pub use crate::temporal::motion::{MotionVectorPass, decode_motion, encode_motion};
