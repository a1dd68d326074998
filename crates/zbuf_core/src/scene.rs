//! Scene representation for the z-buffer renderer.
//!
//! A scene owns its world-space triangles and the octree built over them.
//! Rebuilding replaces both wholesale.

use zbuf_math::{Aabb, Camera, Mat4, Vec3};

use crate::octree::SpatialOctree;
use crate::triangle::Triangle;

/// A triangle that survived culling, in the two spaces the rasterizer needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedTriangle {
    /// Camera space, used for depth and perspective-correct interpolation
    pub view: Triangle,
    /// Canonical cube `[-1, 1]^3`, mapped onto the screen by the viewport
    pub canonical: Triangle,
}

impl ProjectedTriangle {
    /// Transform `t` and apply back-face and frustum culling.
    ///
    /// Returns `None` when the projected triangle faces away from the camera
    /// (or is edge-on), or when none of its vertices lands in the canonical
    /// cube.
    pub fn project(t: &Triangle, model_view: &Mat4, mvp: &Mat4) -> Option<Self> {
        let canonical = *mvp * t;
        if canonical.facing().z <= 0.0 || !canonical.vert_in_canonical() {
            return None;
        }
        Some(Self {
            view: *model_view * t,
            canonical,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scene {
    triangles: Vec<Triangle>,
    octree: SpatialOctree,
    bounds: Aabb,
}

impl Scene {
    /// Take ownership of world-space triangles and build their octree.
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let mut scene = Self::default();
        scene.rebuild(triangles);
        scene
    }

    /// Discard the current geometry and octree, then build from `triangles`.
    pub fn rebuild(&mut self, triangles: Vec<Triangle>) {
        self.octree = SpatialOctree::default();
        self.bounds = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bbox()));
        self.octree = SpatialOctree::build(&triangles);
        self.triangles = triangles;
        log::debug!(
            "Scene: {} triangles, {} octree nodes",
            self.triangles.len(),
            self.octree.len()
        );
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    pub fn octree(&self) -> &SpatialOctree {
        &self.octree
    }

    /// World-space bounds of all triangles, `Aabb::EMPTY` for an empty scene.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Every triangle that survives back-face and frustum culling.
    pub fn to_viewspace(&self, mvp: &Mat4, model_view: &Mat4) -> Vec<ProjectedTriangle> {
        let projected: Vec<_> = self
            .triangles
            .iter()
            .filter_map(|t| ProjectedTriangle::project(t, model_view, mvp))
            .collect();
        log::debug!(
            "real world: {} triangles, viewspace: {} triangles",
            self.triangles.len(),
            projected.len()
        );
        projected
    }

    /// Camera on the +z side of the scene, looking at the centre of the
    /// bounds from just far enough that the bounding sphere fits both fields
    /// of view.
    pub fn generate_camera(&self, fov_y: f32, aspect: f32) -> Camera {
        let (center, radius) = if self.is_empty() {
            (Vec3::ZERO, 1.0)
        } else {
            let extent = self.bounds.max() - self.bounds.min();
            (self.bounds.centroid(), (extent.length() * 0.5).max(1e-3))
        };

        let half_y = (fov_y * 0.5).to_radians();
        let half_x = (half_y.tan() * aspect).atan();
        let distance = radius / half_y.min(half_x).sin();

        let znear = -((distance - radius) * 0.5).min(0.1);
        let zfar = -(distance + 2.0 * radius);

        log::debug!(
            "Generated camera: distance {:.3}, near {:.4}, far {:.3}",
            distance,
            znear,
            zfar
        );
        Camera::new(center + Vec3::new(0.0, 0.0, distance), fov_y, aspect, znear, zfar)
    }
}
