//! Object-space octree over world-space triangles.
//!
//! Nodes live in a flat arena and refer to each other by index. Every node
//! owns the triangles that straddle one of its three splitting planes; the
//! rest are routed to exactly one of eight octants. Triangles are stored as
//! indices into the slice the tree was built from.

use zbuf_math::{Aabb, Mat4, Vec3};

use crate::triangle::Triangle;

/// Nodes holding fewer triangles than this become leaves.
pub const OCTREE_LEAF_THRESHOLD: usize = 24;

/// Subdivision stops here even for crowded nodes, so coincident triangles
/// cannot recurse forever.
const MAX_DEPTH: u32 = 16;

/// Padding added around the root cube so no vertex sits on its boundary.
const ROOT_PAD: f32 = 1e-3;

/// Cube faces as corner triples (corner bit pattern `x | y << 1 | z << 2`),
/// counter-clockwise seen from outside the cube.
const FACETS: [[usize; 3]; 12] = [
    [0, 4, 6],
    [0, 6, 2], // -x
    [1, 3, 7],
    [1, 7, 5], // +x
    [0, 1, 5],
    [0, 5, 4], // -y
    [2, 6, 7],
    [2, 7, 3], // +y
    [0, 2, 3],
    [0, 3, 1], // -z
    [4, 5, 7],
    [4, 7, 6], // +z
];

#[derive(Debug, Clone)]
pub struct OctreeNode {
    bounds: Aabb,
    mid: Vec3,
    /// Outward-facing triangles covering the cube surface
    facets: [Triangle; 12],
    /// Straddling triangles for inner nodes, everything for leaves
    prims: Vec<usize>,
    children: [Option<usize>; 8],
    parent: Option<usize>,
    is_leaf: bool,
    depth: u32,
}

impl OctreeNode {
    fn new(bounds: Aabb, parent: Option<usize>, depth: u32) -> Self {
        let corners = bounds.corners();
        Self {
            bounds,
            mid: bounds.centroid(),
            facets: FACETS.map(|[a, b, c]| Triangle::new(corners[a], corners[b], corners[c])),
            prims: Vec::new(),
            children: [None; 8],
            parent,
            is_leaf: false,
            depth,
        }
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn facets(&self) -> &[Triangle; 12] {
        &self.facets
    }

    /// Indices of the triangles owned by this node.
    pub fn prims(&self) -> &[usize] {
        &self.prims
    }

    /// Child octants, indexed by `(x > mid) | (y > mid) << 1 | (z > mid) << 2`.
    pub fn children(&self) -> &[Option<usize>; 8] {
        &self.children
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Octant of `t`, or `None` when its vertices fall on different sides
    /// of a splitting plane.
    fn octant_of(&self, t: &Triangle) -> Option<usize> {
        let side = |v: Vec3| v.cmpgt(self.mid).bitmask() as usize;
        let [a, b, c] = t.vertices().map(side);
        (a == b && b == c).then_some(a)
    }

    /// Cheap frustum test for the whole cell.
    ///
    /// `eye` is the camera position in the space the tree was built in. A
    /// cell containing the eye is always visible; otherwise the bounding box
    /// of at least one front-facing facet must overlap the canonical cube
    /// after `mvp`. A facet larger than the view, with every corner off
    /// screen, still keeps its cell.
    pub fn is_visible(&self, mvp: &Mat4, eye: Vec3) -> bool {
        if self.bounds.contains_point(eye) {
            return true;
        }
        let cube = Aabb::from_points(Vec3::NEG_ONE, Vec3::ONE);
        self.facets.iter().any(|facet| {
            let canonical = *mvp * facet;
            canonical.facing().z > 0.0 && canonical.bbox().overlaps(&cube)
        })
    }
}

/// 8-way spatial index. Built once, replaced wholesale on rebuild.
#[derive(Debug, Clone, Default)]
pub struct SpatialOctree {
    nodes: Vec<OctreeNode>,
}

impl SpatialOctree {
    pub fn build(triangles: &[Triangle]) -> Self {
        let mut tree = Self::default();
        if triangles.is_empty() {
            log::debug!("Octree: no triangles, empty tree");
            return tree;
        }

        let bounds = triangles
            .iter()
            .fold(Aabb::EMPTY, |acc, t| Aabb::surrounding(&acc, &t.bbox()));
        let cube = bounds.bounding_cube(ROOT_PAD);

        log::debug!("Constructing octree in object space ..");
        tree.build_node(triangles, (0..triangles.len()).collect(), cube, None, 0);
        log::info!(
            "Object space octree constructed: {} nodes, {} triangles",
            tree.nodes.len(),
            triangles.len()
        );
        tree
    }

    fn build_node(
        &mut self,
        triangles: &[Triangle],
        prims: Vec<usize>,
        bounds: Aabb,
        parent: Option<usize>,
        depth: u32,
    ) -> usize {
        let idx = self.nodes.len();
        let mut node = OctreeNode::new(bounds, parent, depth);

        if prims.len() < OCTREE_LEAF_THRESHOLD || depth >= MAX_DEPTH {
            node.is_leaf = true;
            node.prims = prims;
            self.nodes.push(node);
            return idx;
        }

        let mut buckets: [Vec<usize>; 8] = Default::default();
        let mut owned = Vec::new();
        for i in prims {
            match node.octant_of(&triangles[i]) {
                Some(octant) => buckets[octant].push(i),
                None => owned.push(i),
            }
        }
        node.prims = owned;

        let (lo, mid, hi) = (bounds.min(), node.mid, bounds.max());
        self.nodes.push(node);

        for (octant, bucket) in buckets.into_iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            let pick = |bit: usize, l: f32, m: f32, h: f32| {
                if octant & bit != 0 {
                    (m, h)
                } else {
                    (l, m)
                }
            };
            let (x0, x1) = pick(1, lo.x, mid.x, hi.x);
            let (y0, y1) = pick(2, lo.y, mid.y, hi.y);
            let (z0, z1) = pick(4, lo.z, mid.z, hi.z);
            let child_bounds = Aabb::from_points(Vec3::new(x0, y0, z0), Vec3::new(x1, y1, z1));

            let child = self.build_node(triangles, bucket, child_bounds, Some(idx), depth + 1);
            self.nodes[idx].children[octant] = Some(child);
        }
        idx
    }

    /// Root node index, `None` for a tree built from no triangles.
    pub fn root(&self) -> Option<usize> {
        (!self.nodes.is_empty()).then_some(0)
    }

    pub fn node(&self, idx: usize) -> &OctreeNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[OctreeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of triangles stored across all nodes.
    pub fn prim_count(&self) -> usize {
        self.nodes.iter().map(|n| n.prims.len()).sum()
    }
}
