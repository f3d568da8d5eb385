//! Renderer contract, the CPU reference renderer and the full-screen blit primitive.

/// Renderer contract and shared render types.
pub mod backend;
/// Full-screen passes and the blit utility.
pub mod blit;
/// Software reference renderer.
pub mod cpu;
/// CPU-side color images.
pub mod image;
pub(crate) mod raster;
