//! Temporal antialiasing stages: jitter sequencing, motion vectors, history reprojection.

/// History ownership, bootstrap and per-frame compositing.
pub mod compositor;
/// Transform snapshots of the previous frame.
pub mod history;
/// Halton sub-pixel jitter.
pub mod jitter;
/// Motion vector pass and its encoding.
pub mod motion;
/// Neighborhood clamp and temporal blend.
pub mod resolve;
