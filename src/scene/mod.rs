//! Scene and camera contracts consumed by the pipeline, plus small reference implementations.

/// Perspective camera with projection jitter.
pub mod camera;
/// Scene contract and the reference scene graph.
pub mod graph;
/// Unlit materials.
pub mod material;
/// Triangle meshes.
pub mod mesh;
