// Transform utilities for Mat4
//
// Builders for the fixed matrices of the rasterization pipeline, plus a
// homogeneous point transform. Column-vector convention throughout: a point
// is transformed as `m * p`.

use glam::{Mat4, Vec3, Vec4};

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// Transform a point with w=1 and divide the result by its w component.
    fn transform_homogeneous(&self, point: Vec3) -> Vec3;
}

impl Mat4Ext for Mat4 {
    fn transform_homogeneous(&self, point: Vec3) -> Vec3 {
        let homo = *self * point.extend(1.0);
        Vec3::new(homo.x / homo.w, homo.y / homo.w, homo.z / homo.w)
    }
}

/// Squeezes the frustum between the planes `z = near` and `z = far` into a
/// box, keeping both planes fixed.
pub fn perspective_to_orthographic(near: f32, far: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(near, 0.0, 0.0, 0.0),
        Vec4::new(0.0, near, 0.0, 0.0),
        Vec4::new(0.0, 0.0, near + far, 1.0),
        Vec4::new(0.0, 0.0, -near * far, 0.0),
    )
}

/// Maps the canonical cube `[-1, 1]^3` onto a `width x height` screen. The
/// z coordinate passes through unchanged.
pub fn viewport_matrix(width: u32, height: u32) -> Mat4 {
    let half_w = width as f32 * 0.5;
    let half_h = height as f32 * 0.5;
    Mat4::from_scale(Vec3::new(half_w, half_h, 1.0))
        * Mat4::from_translation(Vec3::new(1.0, 1.0, 0.0))
}
