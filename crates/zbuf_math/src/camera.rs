use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::transform::perspective_to_orthographic;

/// Camera extrinsics and intrinsics, injected into the renderer as a value.
///
/// The camera looks along `gaze`; clip planes are given as z coordinates in
/// camera space, so both are negative and `zfar < znear < 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub gaze: Vec3,
    pub up: Vec3,
    /// Vertical field of view, in degrees
    pub fov_y: f32,
    /// width / height
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    /// Create a new camera looking down -Z with Y up.
    pub fn new(position: Vec3, fov_y: f32, aspect: f32, znear: f32, zfar: f32) -> Self {
        Self {
            position,
            gaze: Vec3::NEG_Z,
            up: Vec3::Y,
            fov_y,
            aspect,
            znear,
            zfar,
        }
    }

    /// Set gaze and up directions.
    pub fn with_orientation(mut self, gaze: Vec3, up: Vec3) -> Self {
        self.gaze = gaze;
        self.up = up;
        self
    }

    /// Orthonormal camera basis `(right, up, -gaze)`.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let w = -self.gaze.normalize();
        let u = self.up.cross(w).normalize();
        let v = w.cross(u);
        (u, v, w)
    }

    /// World → camera space: translate the eye to the origin, then rotate the
    /// camera basis onto the world axes.
    pub fn view_matrix(&self) -> Mat4 {
        let (u, v, w) = self.basis();
        let rotate = Mat4::from_cols(
            Vec4::new(u.x, v.x, w.x, 0.0),
            Vec4::new(u.y, v.y, w.y, 0.0),
            Vec4::new(u.z, v.z, w.z, 0.0),
            Vec4::W,
        );
        rotate * Mat4::from_translation(-self.position)
    }

    /// Camera space → canonical cube `[-1, 1]^3`. The near plane lands on
    /// z = +1 and the far plane on z = -1.
    pub fn projection_matrix(&self) -> Mat4 {
        let (n, f) = (self.znear, self.zfar);
        let top = (self.fov_y.to_radians() * 0.5).tan() * n.abs();
        let right = top * self.aspect;

        let center = Mat4::from_translation(Vec3::new(0.0, 0.0, -(n + f) * 0.5));
        let scale = Mat4::from_scale(Vec3::new(1.0 / right, 1.0 / top, 2.0 / (n - f).abs()));

        scale * center * perspective_to_orthographic(n, f)
    }

    /// Update aspect ratio (e.g., on resolution change)
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }
}
