//! Hierarchical depth buffer (z-pyramid).
//!
//! A quadtree over the screen rectangle where every node stores the minimum
//! depth painted anywhere below it. Depths are view-space z values: larger
//! is nearer, and unpainted pixels hold `-inf`. A triangle whose nearest
//! point is farther than the minimum of the smallest node covering it is
//! hidden behind pixels that are already painted.
//!
//! Nodes live in a flat arena and point at each other by index. Leaves are
//! exactly one pixel and are also indexed row-major for O(1) lookup.

use zbuf_core::Triangle;
use zbuf_math::UVec2;

use crate::image_buffer::pixel_index;

/// Quadrant slots. Bit 0 selects east, bit 1 selects north.
const SW: usize = 0;
const SE: usize = 1;
const NW: usize = 2;
const NE: usize = 3;

#[derive(Debug, Clone)]
pub struct PyramidNode {
    /// Inclusive lower-left pixel
    sw: UVec2,
    /// Exclusive upper-right pixel
    ne: UVec2,
    /// Pixels with `x >= split.x` go east, `y >= split.y` go north
    split: UVec2,
    depth: f32,
    /// Distance from the root
    tdep: u32,
    is_leaf: bool,
    parent: Option<usize>,
    children: [Option<usize>; 4],
}

impl PyramidNode {
    /// Pixel rectangle `[sw, ne)`.
    pub fn rect(&self) -> (UVec2, UVec2) {
        (self.sw, self.ne)
    }

    pub fn split(&self) -> UVec2 {
        self.split
    }

    /// Minimum depth painted in this subtree.
    pub fn depth(&self) -> f32 {
        self.depth
    }

    pub fn tdep(&self) -> u32 {
        self.tdep
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Children in SW, SE, NW, NE order. A quadrant is `None` once one
    /// screen dimension has been split down to a single pixel.
    pub fn children(&self) -> &[Option<usize>; 4] {
        &self.children
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        (self.sw.x..self.ne.x).contains(&x) && (self.sw.y..self.ne.y).contains(&y)
    }

    /// Quadrant a screen-space point falls in.
    fn idof(&self, x: f32, y: f32) -> usize {
        let east = (x >= self.split.x as f32) as usize;
        let north = (y >= self.split.y as f32) as usize;
        east | north << 1
    }
}

#[derive(Debug, Clone)]
pub struct DepthPyramid {
    width: u32,
    height: u32,
    nodes: Vec<PyramidNode>,
    /// Row-major leaf index: `leaves[y * width + x]`
    leaves: Vec<usize>,
}

impl DepthPyramid {
    /// Build the pyramid for a `width x height` screen, every pixel unpainted.
    ///
    /// # Panics
    ///
    /// If either dimension is zero.
    pub fn new(height: u32, width: u32) -> Self {
        assert!(
            width > 0 && height > 0,
            "depth pyramid needs a non-empty screen, got {width}x{height}"
        );

        let pixels = width as usize * height as usize;
        let mut pyramid = Self {
            width,
            height,
            nodes: Vec::with_capacity(2 * pixels),
            leaves: vec![usize::MAX; pixels],
        };
        pyramid.build(UVec2::ZERO, UVec2::new(width, height), None);
        pyramid.assign_tdep();

        log::info!(
            "Hierarchical depth buffer constructed: {}x{}, {} nodes",
            width,
            height,
            pyramid.nodes.len()
        );
        pyramid
    }

    fn build(&mut self, sw: UVec2, ne: UVec2, parent: Option<usize>) -> Option<usize> {
        if sw.x >= ne.x || sw.y >= ne.y {
            return None;
        }

        let idx = self.nodes.len();
        let split = (sw + ne) / 2;
        let is_leaf = ne - sw == UVec2::ONE;
        self.nodes.push(PyramidNode {
            sw,
            ne,
            split,
            depth: f32::NEG_INFINITY,
            tdep: 0,
            is_leaf,
            parent,
            children: [None; 4],
        });

        if is_leaf {
            self.leaves[pixel_index(self.width, sw.x, sw.y)] = idx;
            return Some(idx);
        }

        let mut children = [None; 4];
        children[SW] = self.build(sw, split, Some(idx));
        children[SE] = self.build(UVec2::new(split.x, sw.y), UVec2::new(ne.x, split.y), Some(idx));
        children[NW] = self.build(UVec2::new(sw.x, split.y), UVec2::new(split.x, ne.y), Some(idx));
        children[NE] = self.build(split, ne, Some(idx));
        self.nodes[idx].children = children;
        Some(idx)
    }

    /// Parents are always pushed before their children, so a single forward
    /// pass sees every parent's `tdep` before it is needed.
    fn assign_tdep(&mut self) {
        for i in 0..self.nodes.len() {
            self.nodes[i].tdep = match self.nodes[i].parent {
                Some(p) => self.nodes[p].tdep + 1,
                None => 0,
            };
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn root(&self) -> usize {
        0
    }

    pub fn node(&self, idx: usize) -> &PyramidNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[PyramidNode] {
        &self.nodes
    }

    /// Leaf covering pixel `(x, y)`. Coordinates are clamped to the screen.
    pub fn which(&self, x: i64, y: i64) -> usize {
        let x = x.clamp(0, self.width as i64 - 1) as u32;
        let y = y.clamp(0, self.height as i64 - 1) as u32;
        self.leaves[pixel_index(self.width, x, y)]
    }

    /// Depth painted at pixel `(x, y)`.
    pub fn depth(&self, x: u32, y: u32) -> f32 {
        self.nodes[self.which(x as i64, y as i64)].depth
    }

    /// Paint pixel `(x, y)` with depth `z` and refresh the minimum of every
    /// ancestor.
    pub fn setz(&mut self, x: u32, y: u32, z: f32) {
        let leaf = self.which(x as i64, y as i64);
        self.nodes[leaf].depth = z;

        let mut current = self.nodes[leaf].parent;
        while let Some(idx) = current {
            let min = self.nodes[idx]
                .children
                .iter()
                .flatten()
                .map(|&c| self.nodes[c].depth)
                .fold(f32::INFINITY, f32::min);
            if min == self.nodes[idx].depth {
                // Ancestors above already agree
                break;
            }
            self.nodes[idx].depth = min;
            current = self.nodes[idx].parent;
        }
    }

    /// Lowest common ancestor of two nodes.
    pub fn lca(&self, mut a: usize, mut b: usize) -> usize {
        while a != b {
            let (ta, tb) = (self.nodes[a].tdep, self.nodes[b].tdep);
            if ta >= tb {
                a = self.step_up(a);
            }
            if tb >= ta {
                b = self.step_up(b);
            }
        }
        a
    }

    fn step_up(&self, idx: usize) -> usize {
        // Only the root has no parent, and two nodes meet there at the latest
        self.nodes[idx].parent.unwrap_or(idx)
    }

    /// Bottom-up occlusion test for a screen-space triangle whose z values
    /// are view-space depths.
    ///
    /// Returns `false` only when the triangle is certainly hidden: its
    /// nearest vertex lies behind every pixel painted under the smallest node
    /// covering all three vertices.
    pub fn visible(&self, t: &Triangle) -> bool {
        let [a, b, c] = t
            .vertices()
            .map(|v| self.which(v.x.floor() as i64, v.y.floor() as i64));
        let cover = self.lca(self.lca(a, b), c);
        !(nearest_depth(t) < self.nodes[cover].depth)
    }

    /// Top-down occlusion test starting at `node`.
    ///
    /// Descends while all three vertices share a quadrant and reports the
    /// triangle as visible as soon as they do not.
    pub fn visible_from(&self, t: &Triangle, node: usize) -> bool {
        let zmax = nearest_depth(t);
        let mut current = node;
        loop {
            let n = &self.nodes[current];
            if zmax < n.depth {
                return false;
            }
            if n.is_leaf {
                return true;
            }
            let [a, b, c] = t.vertices().map(|v| n.idof(v.x, v.y));
            if a != b || b != c {
                return true;
            }
            match n.children[a] {
                Some(child) => current = child,
                None => return true,
            }
        }
    }

    /// Reset every depth to unpainted, keeping the topology.
    pub fn clear(&mut self) {
        for node in &mut self.nodes {
            node.depth = f32::NEG_INFINITY;
        }
    }
}

/// Largest view-space z of the three vertices, i.e. the nearest one.
fn nearest_depth(t: &Triangle) -> f32 {
    t.a().z.max(t.b().z).max(t.c().z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use zbuf_math::Vec3;

    fn screen_triangle(p: [(f32, f32); 3], z: f32) -> Triangle {
        let [a, b, c] = p.map(|(x, y)| Vec3::new(x, y, z));
        Triangle::new(a, b, c)
    }

    fn paint_all(pyramid: &mut DepthPyramid, z: f32) {
        for y in 0..pyramid.height() {
            for x in 0..pyramid.width() {
                pyramid.setz(x, y, z);
            }
        }
    }

    fn assert_aggregate(pyramid: &DepthPyramid) {
        for node in pyramid.nodes().iter().filter(|n| !n.is_leaf()) {
            let min = node
                .children()
                .iter()
                .flatten()
                .map(|&c| pyramid.node(c).depth())
                .fold(f32::INFINITY, f32::min);
            assert_eq!(node.depth(), min);
        }
    }

    fn ancestors(pyramid: &DepthPyramid, mut idx: usize) -> Vec<usize> {
        let mut chain = vec![idx];
        while let Some(p) = pyramid.node(idx).parent() {
            chain.push(p);
            idx = p;
        }
        chain
    }

    #[test]
    fn test_fully_painted_root() {
        let mut pyramid = DepthPyramid::new(4, 4);
        paint_all(&mut pyramid, 5.0);

        assert_eq!(pyramid.node(pyramid.root()).depth(), 5.0);
    }

    #[test]
    fn test_hidden_triangle_rejected() {
        let mut pyramid = DepthPyramid::new(4, 4);
        paint_all(&mut pyramid, 0.0);

        let t = screen_triangle([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], -2.0);
        assert!(!pyramid.visible(&t));
        assert!(!pyramid.visible_from(&t, pyramid.root()));

        let nearer = screen_triangle([(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], 1.0);
        assert!(pyramid.visible(&nearer));
    }

    #[test]
    fn test_unpainted_screen_shows_everything() {
        let pyramid = DepthPyramid::new(8, 8);
        let t = screen_triangle([(0.5, 0.5), (7.5, 0.5), (3.0, 7.5)], -1000.0);
        assert!(pyramid.visible(&t));
        assert!(pyramid.visible_from(&t, pyramid.root()));
    }

    #[test]
    fn test_topology() {
        let pyramid = DepthPyramid::new(5, 7);
        let leaves: Vec<_> = pyramid.nodes().iter().filter(|n| n.is_leaf()).collect();
        assert_eq!(leaves.len(), 35);

        for leaf in leaves {
            let (sw, ne) = leaf.rect();
            assert_eq!(ne - sw, UVec2::ONE);
        }
        for (i, node) in pyramid.nodes().iter().enumerate() {
            for &c in node.children().iter().flatten() {
                assert_eq!(pyramid.node(c).parent(), Some(i));
                assert_eq!(pyramid.node(c).tdep(), node.tdep() + 1);
            }
        }
        assert_eq!(pyramid.node(pyramid.root()).tdep(), 0);
    }

    #[test]
    fn test_single_row_screen() {
        let mut pyramid = DepthPyramid::new(1, 6);
        for x in 0..6 {
            assert!(pyramid.node(pyramid.which(x, 0)).contains(x as u32, 0));
        }
        pyramid.setz(3, 0, -4.0);
        assert_eq!(pyramid.depth(3, 0), -4.0);
        // Other pixels are still unpainted
        assert_eq!(pyramid.node(pyramid.root()).depth(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_which_unique_leaf() {
        let pyramid = DepthPyramid::new(6, 9);
        let mut seen = std::collections::HashSet::new();

        for y in 0..6 {
            for x in 0..9 {
                let leaf = pyramid.which(x, y);
                let node = pyramid.node(leaf);
                assert!(node.is_leaf());
                assert!(node.contains(x as u32, y as u32));
                assert!(seen.insert(leaf));
            }
        }
    }

    #[test]
    fn test_which_clamps() {
        let pyramid = DepthPyramid::new(4, 4);
        assert_eq!(pyramid.which(-3, 2), pyramid.which(0, 2));
        assert_eq!(pyramid.which(10, 10), pyramid.which(3, 3));
    }

    #[test]
    fn test_aggregate_after_random_writes() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut pyramid = DepthPyramid::new(13, 17);

        for _ in 0..500 {
            let x = rng.gen_range(0..17);
            let y = rng.gen_range(0..13);
            pyramid.setz(x, y, rng.gen_range(-100.0..-0.1));
        }
        // Every pixel painted, including overwrites with larger and smaller depths
        paint_all(&mut pyramid, -50.0);
        for _ in 0..500 {
            let x = rng.gen_range(0..17);
            let y = rng.gen_range(0..13);
            pyramid.setz(x, y, rng.gen_range(-100.0..-0.1));
        }
        assert_aggregate(&pyramid);
    }

    #[test]
    fn test_overwrite_with_nearer_depth_raises_minimum() {
        let mut pyramid = DepthPyramid::new(2, 2);
        paint_all(&mut pyramid, -10.0);
        for y in 0..2 {
            for x in 0..2 {
                pyramid.setz(x, y, -1.0);
            }
        }
        assert_eq!(pyramid.node(pyramid.root()).depth(), -1.0);
        assert_aggregate(&pyramid);
    }

    #[test]
    fn test_lca_is_deepest_common_ancestor() {
        let mut rng = StdRng::seed_from_u64(11);
        let pyramid = DepthPyramid::new(10, 12);
        let n = pyramid.nodes().len();

        for _ in 0..200 {
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            let lca = pyramid.lca(a, b);

            let up_a = ancestors(&pyramid, a);
            let up_b = ancestors(&pyramid, b);
            assert!(up_a.contains(&lca) && up_b.contains(&lca));

            let deepest = up_a
                .iter()
                .filter(|i| up_b.contains(i))
                .map(|&i| pyramid.node(i).tdep())
                .max()
                .unwrap();
            assert_eq!(pyramid.node(lca).tdep(), deepest);
        }
    }

    #[test]
    fn test_lca_of_node_with_itself() {
        let pyramid = DepthPyramid::new(4, 4);
        let leaf = pyramid.which(2, 1);
        assert_eq!(pyramid.lca(leaf, leaf), leaf);
        assert_eq!(pyramid.lca(leaf, pyramid.root()), pyramid.root());
    }

    #[test]
    fn test_setz_then_visible() {
        let mut pyramid = DepthPyramid::new(8, 8);
        pyramid.setz(5, 6, -3.0);

        // All vertices in pixel (5, 6)
        let spot = [(5.1, 6.1), (5.9, 6.2), (5.4, 6.9)];
        assert!(!pyramid.visible(&screen_triangle(spot, -3.5)));
        assert!(pyramid.visible(&screen_triangle(spot, -2.5)));
        assert!(!pyramid.visible_from(&screen_triangle(spot, -3.5), pyramid.root()));
        assert!(pyramid.visible_from(&screen_triangle(spot, -2.5), pyramid.root()));
    }

    #[test]
    fn test_visible_from_spanning_quadrants() {
        let mut pyramid = DepthPyramid::new(8, 8);
        // Paint the left half only
        for y in 0..8 {
            for x in 0..4 {
                pyramid.setz(x, y, 0.0);
            }
        }
        let behind = [(0.5, 0.5), (3.5, 0.5), (0.5, 3.5)];
        assert!(!pyramid.visible_from(&screen_triangle(behind, -1.0), pyramid.root()));

        // Straddles the painted and unpainted halves
        let spanning = [(0.5, 0.5), (6.5, 0.5), (0.5, 3.5)];
        assert!(pyramid.visible_from(&screen_triangle(spanning, -1.0), pyramid.root()));
        assert!(pyramid.visible(&screen_triangle(spanning, -1.0)));
    }

    #[test]
    fn test_clear_keeps_topology() {
        let mut pyramid = DepthPyramid::new(4, 6);
        let count = pyramid.nodes().len();
        paint_all(&mut pyramid, 2.0);
        pyramid.clear();

        assert_eq!(pyramid.nodes().len(), count);
        assert!(pyramid
            .nodes()
            .iter()
            .all(|n| n.depth() == f32::NEG_INFINITY));
    }

    #[test]
    #[should_panic(expected = "non-empty screen")]
    fn test_zero_size_panics() {
        DepthPyramid::new(0, 4);
    }
}
