//! Indexed mesh geometry.
//!
//! Meshes are what the OBJ loader produces; the renderer only ever sees the
//! flat list of `Triangle`s a mesh expands into.

use zbuf_math::{Aabb, Vec3};

use crate::triangle::{Triangle, DEFAULT_VERTEX_COLOR};
use crate::Color;

/// A mesh consisting of vertex positions, optional normals and colors, and
/// triangle indices.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions (one Vec3 per vertex)
    pub positions: Vec<Vec3>,

    /// Vertex normals (optional - computed on demand)
    pub normals: Option<Vec<Vec3>>,

    /// Vertex colors (optional - mid grey when absent)
    pub colors: Option<Vec<Color>>,

    /// Triangle indices (every 3 indices form a counter-clockwise triangle)
    pub indices: Vec<u32>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a new mesh from positions and indices, optionally with normals.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>, normals: Option<Vec<Vec3>>) -> Self {
        let bounds = Aabb::from_iter(positions.iter().copied());
        Self {
            positions,
            normals,
            colors: None,
            indices,
            bounds,
        }
    }

    /// Attach per-vertex colors.
    pub fn with_colors(mut self, colors: Vec<Color>) -> Self {
        self.colors = Some(colors);
        self
    }

    /// Compute smooth vertex normals by summing the area-weighted face
    /// normals of every face sharing the vertex.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.faces() {
            let [p0, p1, p2] = face.map(|i| self.positions[i]);
            // Counter-clockwise winding, length is twice the face area
            let face_normal = (p1 - p0).cross(p2 - p0);
            for i in face {
                normals[i] += face_normal;
            }
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Ensure the mesh has per-vertex normals, computing them if necessary.
    /// Also recomputes if existing normals don't match the vertex count
    /// (face-varying normals).
    pub fn ensure_normals(&mut self) {
        let count = self.normals.as_ref().map(Vec::len);
        if count != Some(self.positions.len()) {
            if let Some(n) = count {
                log::debug!(
                    "Normals array length ({}) doesn't match vertex count ({}), computing smooth normals",
                    n,
                    self.positions.len()
                );
            }
            self.compute_normals();
        }
    }

    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Expand into standalone triangles.
    ///
    /// Faces with out-of-range indices are skipped with a warning. Without
    /// normals each triangle falls back to its facing direction; without
    /// colors every vertex is mid grey.
    pub fn to_triangles(&self) -> Vec<Triangle> {
        let normals = self
            .normals
            .as_ref()
            .filter(|n| n.len() == self.positions.len());
        let colors = self
            .colors
            .as_ref()
            .filter(|c| c.len() == self.positions.len());

        self.faces()
            .map(|face| {
                let [a, b, c] = face.map(|i| self.positions[i]);
                let mut t = Triangle::new(a, b, c);
                if let Some(n) = normals {
                    t = t.with_normals(face.map(|i| n[i]));
                }
                let col = colors.map_or([DEFAULT_VERTEX_COLOR; 3], |c| face.map(|i| c[i]));
                t.with_colors(col)
            })
            .collect()
    }

    /// Valid index triples. Trailing indices and out-of-range faces are
    /// dropped.
    fn faces(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let vertex_count = self.positions.len();
        self.indices.chunks_exact(3).filter_map(move |chunk| {
            let face = [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize];
            if face.iter().any(|&i| i >= vertex_count) {
                log::warn!(
                    "Invalid triangle indices: {:?}, vertex count: {}",
                    face,
                    vertex_count
                );
                return None;
            }
            Some(face)
        })
    }

    /// Axis-aligned box `[min, max]` with outward-facing triangles.
    pub fn cube(min: Vec3, max: Vec3) -> Self {
        let positions = Aabb::from_points(min, max).corners().to_vec();
        #[rustfmt::skip]
        let indices = vec![
            0, 4, 6, 0, 6, 2, // -x
            1, 3, 7, 1, 7, 5, // +x
            0, 1, 5, 0, 5, 4, // -y
            2, 6, 7, 2, 7, 3, // +y
            0, 2, 3, 0, 3, 1, // -z
            4, 5, 7, 4, 7, 6, // +z
        ];
        Self::new(positions, indices, None)
    }

    /// Latitude/longitude sphere with smooth normals.
    pub fn uv_sphere(center: Vec3, radius: f32, rings: u32, segments: u32) -> Self {
        let rings = rings.max(2);
        let segments = segments.max(3);
        let mut positions = Vec::with_capacity(((rings + 1) * (segments + 1)) as usize);
        let mut normals = Vec::with_capacity(positions.capacity());

        for r in 0..=rings {
            let theta = std::f32::consts::PI * r as f32 / rings as f32;
            for s in 0..=segments {
                let phi = std::f32::consts::TAU * s as f32 / segments as f32;
                let n = Vec3::new(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin());
                positions.push(center + n * radius);
                normals.push(n);
            }
        }

        let stride = segments + 1;
        let mut indices = Vec::with_capacity((rings * segments * 6) as usize);
        for r in 0..rings {
            for s in 0..segments {
                let i0 = r * stride + s;
                let i1 = i0 + stride;
                // The pole rows collapse to a point, skip their zero-area halves
                if r != 0 {
                    indices.extend_from_slice(&[i0, i0 + 1, i1]);
                }
                if r != rings - 1 {
                    indices.extend_from_slice(&[i0 + 1, i1 + 1, i1]);
                }
            }
        }

        Self::new(positions, indices, Some(normals))
    }
}
