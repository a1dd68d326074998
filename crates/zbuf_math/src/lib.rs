// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod camera;
mod interval;
mod transform;

pub use aabb::Aabb;
pub use camera::Camera;
pub use interval::Interval;
pub use transform::{perspective_to_orthographic, viewport_matrix, Mat4Ext};
