//! zbuf renderer - CPU z-buffer rasterization.
//!
//! Rasterizes a `zbuf_core::Scene` into an in-memory image with one of
//! three methods: a plain bounding-box scan, the same scan gated by a
//! hierarchical depth buffer, or an octree walk that also skips cells
//! outside the view frustum.

mod image_buffer;
mod pyramid;
mod renderer;
pub mod shader;

pub use image_buffer::{clamp_01, color_to_rgb, ImageBuffer};
pub use pyramid::{DepthPyramid, PyramidNode};
pub use renderer::{RenderError, RenderMethod, RenderStats, Renderer, RendererState};
pub use shader::Shader;

/// Re-export common types from the core crates
pub use zbuf_core::{Color, Scene, Triangle};
pub use zbuf_math::{Camera, Mat4, Vec3};
