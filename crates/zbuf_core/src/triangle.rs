//! Triangle primitive for rasterization.
//!
//! A triangle is a value: transforming it produces a new triangle whose
//! derived data (facing direction, bounding box) is recomputed from the new
//! vertex positions.

use std::ops::Mul;

use zbuf_math::{Aabb, Mat4, Mat4Ext, Vec3};

use crate::Color;

/// Barycentric weights `(w0, w1, w2)` of a point with respect to the
/// vertices `a`, `b`, `c`.
pub type Barycentric = (f32, f32, f32);

/// Color given to vertices when the mesh has none.
pub const DEFAULT_VERTEX_COLOR: Color = Color::new(0.5, 0.5, 0.5);

/// A triangle with per-vertex normals and colors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    /// Vertices, counter-clockwise when seen from the front
    vtx: [Vec3; 3],
    /// Per-vertex normal directions (unit length)
    nor: [Vec3; 3],
    /// Per-vertex colors
    col: [Color; 3],
    /// normalize(cross(v1 - v0, v2 - v1)), zero for degenerate triangles
    facing: Vec3,
    /// Bounding box of the three vertices
    bbox: Aabb,
}

impl Triangle {
    /// Create a triangle from three counter-clockwise vertices. Normals
    /// default to the facing direction, colors to mid grey.
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let mut t = Self {
            vtx: [a, b, c],
            nor: [Vec3::ZERO; 3],
            col: [DEFAULT_VERTEX_COLOR; 3],
            facing: Vec3::ZERO,
            bbox: Aabb::EMPTY,
        };
        t.update_derived();
        t.nor = [t.facing; 3];
        t
    }

    /// Set per-vertex normals. They are normalized on the way in.
    pub fn with_normals(mut self, normals: [Vec3; 3]) -> Self {
        self.nor = normals.map(Vec3::normalize_or_zero);
        self
    }

    /// Set per-vertex colors.
    pub fn with_colors(mut self, colors: [Color; 3]) -> Self {
        self.col = colors;
        self
    }

    /// Same triangle with the z coordinate of each vertex replaced.
    pub fn with_depths(&self, depths: [f32; 3]) -> Self {
        let mut ret = *self;
        for (v, z) in ret.vtx.iter_mut().zip(depths) {
            v.z = z;
        }
        ret.update_derived();
        ret
    }

    pub fn a(&self) -> Vec3 {
        self.vtx[0]
    }
    pub fn b(&self) -> Vec3 {
        self.vtx[1]
    }
    pub fn c(&self) -> Vec3 {
        self.vtx[2]
    }
    pub fn vertices(&self) -> [Vec3; 3] {
        self.vtx
    }

    pub fn na(&self) -> Vec3 {
        self.nor[0]
    }
    pub fn nb(&self) -> Vec3 {
        self.nor[1]
    }
    pub fn nc(&self) -> Vec3 {
        self.nor[2]
    }

    pub fn ca(&self) -> Color {
        self.col[0]
    }
    pub fn cb(&self) -> Color {
        self.col[1]
    }
    pub fn cc(&self) -> Color {
        self.col[2]
    }

    /// Unit facing direction, used for back-face culling.
    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    pub fn bbox(&self) -> Aabb {
        self.bbox
    }

    pub fn centroid(&self) -> Vec3 {
        (self.vtx[0] + self.vtx[1] + self.vtx[2]) / 3.0
    }

    /// z component of the 2D cross product of the edges, on the xy plane.
    /// Positive for counter-clockwise triangles.
    pub fn signed_doublearea(&self) -> f32 {
        let [a, b, c] = self.vtx;
        cross2d(a, b, c)
    }

    pub fn doublearea(&self) -> f32 {
        self.signed_doublearea().abs()
    }

    pub fn area(&self) -> f32 {
        0.5 * self.doublearea()
    }

    /// Whether `(x, y)` lies strictly inside the triangle projected onto the
    /// xy plane. Points exactly on an edge are rejected; a zero-area triangle
    /// contains the points where all three edge products vanish.
    pub fn contains(&self, x: f32, y: f32) -> bool {
        let d = self.vtx.map(|v| Vec3::new(v.x - x, v.y - y, 0.0));
        let z0 = sign(d[0].cross(d[1]).z);
        let z1 = sign(d[1].cross(d[2]).z);
        let z2 = sign(d[2].cross(d[0]).z);
        z0 == z1 && z1 == z2
    }

    /// Barycentric weights of `(x, y)`.
    ///
    /// # Panics
    ///
    /// If the point is not inside the triangle.
    pub fn barycentric(&self, x: f32, y: f32) -> Barycentric {
        assert!(
            self.contains(x, y),
            "barycentric weights requested for ({x}, {y}) outside of triangle {:?}",
            self.vtx
        );
        let p = Vec3::new(x, y, 0.0);
        let [a, b, c] = self.vtx;
        let whole = self.doublearea();
        let ca = cross2d(p, b, c).abs() / whole;
        let cb = cross2d(p, a, c).abs() / whole;
        (ca, cb, 1.0 - ca - cb)
    }

    /// Perspective-correct depth at the given weights: the reciprocal of the
    /// weighted sum of reciprocal vertex depths.
    pub fn depth_at(&self, (ca, cb, cc): Barycentric) -> f32 {
        let [a, b, c] = self.vtx;
        1.0 / (ca / a.z + cb / b.z + cc / c.z)
    }

    /// Perspective-correct color: each vertex color is weighted by
    /// `w_i / z_i`, then the sum is scaled back by `z_view`.
    pub fn color_at(&self, ca: f32, cb: f32, cc: f32, z_view: f32) -> Color {
        let [a, b, c] = self.vtx;
        let zv_reciprocal = 1.0 / z_view;
        (ca * self.col[0] / a.z + cb * self.col[1] / b.z + cc * self.col[2] / c.z)
            / zv_reciprocal
    }

    /// True if at least one vertex lies inside the canonical cube `[-1, 1]^3`.
    ///
    /// Not conservative: a triangle crossing the cube with every vertex
    /// outside of it is reported as outside.
    pub fn vert_in_canonical(&self) -> bool {
        self.vtx
            .iter()
            .any(|v| v.abs().cmple(Vec3::ONE).all())
    }

    /// Apply a homogeneous transform to each vertex, dividing by w.
    pub fn transform(&self, m: &Mat4) -> Triangle {
        let mut ret = *self;
        ret.vtx = self.vtx.map(|v| m.transform_homogeneous(v));
        ret.update_derived();
        ret
    }

    fn update_derived(&mut self) {
        let [a, b, c] = self.vtx;
        self.facing = (b - a).cross(c - b).normalize_or_zero();
        self.bbox = Aabb::from_iter(self.vtx);
    }
}

impl Mul<&Triangle> for Mat4 {
    type Output = Triangle;

    fn mul(self, t: &Triangle) -> Triangle {
        t.transform(&self)
    }
}

impl Mul<Triangle> for Mat4 {
    type Output = Triangle;

    fn mul(self, t: Triangle) -> Triangle {
        t.transform(&self)
    }
}

fn cross2d(a: Vec3, b: Vec3, c: Vec3) -> f32 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// -1, 0 or 1. Unlike `f32::signum`, zero maps to zero.
fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}
