use crate::{Interval, Vec3};

/// Axis-Aligned Bounding Box used by triangles and octree cells.
///
/// An AABB is defined by three intervals (one per axis) that bound a 3D volume.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Create an AABB from two corner points.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let x = Interval::new(a.x.min(b.x), a.x.max(b.x));
        let y = Interval::new(a.y.min(b.y), a.y.max(b.y));
        let z = Interval::new(a.z.min(b.z), a.z.max(b.z));
        Self { x, y, z }
    }

    /// Create an AABB that surrounds two other AABBs.
    pub fn surrounding(box0: &Aabb, box1: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&box0.x, &box1.x),
            y: Interval::surrounding(&box0.y, &box1.y),
            z: Interval::surrounding(&box0.z, &box1.z),
        }
    }

    /// Grow the box so it also covers `p`.
    pub fn include_point(&self, p: Vec3) -> Self {
        Self {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    /// Get the interval for a specific axis (0=X, 1=Y, 2=Z).
    pub fn axis_interval(&self, n: usize) -> Interval {
        match n {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        Vec3::new(self.x.mid(), self.y.mid(), self.z.mid())
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    pub fn longest_axis(&self) -> usize {
        let x_size = self.x.size();
        let y_size = self.y.size();
        let z_size = self.z.size();

        if x_size > y_size && x_size > z_size {
            0
        } else if y_size > z_size {
            1
        } else {
            2
        }
    }

    /// Smallest cube sharing this box's centre that contains it, grown by
    /// `pad` on every side.
    pub fn bounding_cube(&self, pad: f32) -> Aabb {
        let half = self.axis_interval(self.longest_axis()).size() * 0.5 + pad;
        let c = self.centroid();
        Aabb::from_points(c - Vec3::splat(half), c + Vec3::splat(half))
    }

    /// The 8 corners, indexed by the bit pattern `x | y << 1 | z << 2`
    /// where a set bit selects the max side of that axis.
    pub fn corners(&self) -> [Vec3; 8] {
        let (lo, hi) = (self.min(), self.max());
        std::array::from_fn(|i| {
            Vec3::new(
                if i & 1 != 0 { hi.x } else { lo.x },
                if i & 2 != 0 { hi.y } else { lo.y },
                if i & 4 != 0 { hi.z } else { lo.z },
            )
        })
    }

    /// Inclusive containment test.
    pub fn contains_point(&self, p: Vec3) -> bool {
        self.x.contains(p.x) && self.y.contains(p.y) && self.z.contains(p.z)
    }

    /// Returns true if the boxes overlap on every axis.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.x.overlaps(&other.x) && self.y.overlaps(&other.y) && self.z.overlaps(&other.z)
    }

    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

/// Tightest box around a set of points. Empty input gives `Aabb::EMPTY`.
impl FromIterator<Vec3> for Aabb {
    fn from_iter<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        points
            .into_iter()
            .fold(Aabb::EMPTY, |acc, p| acc.include_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points(Vec3::new(10.0, 0.0, 10.0), Vec3::new(0.0, 10.0, 0.0));

        assert_eq!(aabb.x.min, 0.0);
        assert_eq!(aabb.x.max, 10.0);
        assert_eq!(aabb.y.min, 0.0);
        assert_eq!(aabb.y.max, 10.0);
        assert_eq!(aabb.z.min, 0.0);
        assert_eq!(aabb.z.max, 10.0);
    }

    #[test]
    fn test_aabb_from_iter() {
        let aabb = Aabb::from_iter([
            Vec3::new(1.0, -2.0, 0.5),
            Vec3::new(-1.0, 4.0, 0.0),
            Vec3::new(0.0, 0.0, 3.0),
        ]);
        assert_eq!(aabb.min(), Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max(), Vec3::new(1.0, 4.0, 3.0));

        assert_eq!(Aabb::from_iter(std::iter::empty()), Aabb::EMPTY);
    }

    #[test]
    fn test_aabb_overlaps() {
        let unit = Aabb::from_points(Vec3::NEG_ONE, Vec3::ONE);

        // Much larger than the unit box, no corner inside it
        let slab = Aabb::from_points(Vec3::new(-10.0, -10.0, -0.5), Vec3::new(10.0, 10.0, 0.5));
        assert!(unit.overlaps(&slab));
        assert!(slab.overlaps(&unit));

        let beside = Aabb::from_points(Vec3::new(2.0, -1.0, -1.0), Vec3::new(3.0, 1.0, 1.0));
        assert!(!unit.overlaps(&beside));
    }

    #[test]
    fn test_aabb_surrounding() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let box2 = Aabb::from_points(Vec3::new(3.0, 3.0, 3.0), Vec3::new(10.0, 10.0, 10.0));
        let surrounding = Aabb::surrounding(&box1, &box2);

        assert_eq!(surrounding.x.min, 0.0);
        assert_eq!(surrounding.x.max, 10.0);
    }

    #[test]
    fn test_aabb_longest_axis() {
        let aabb_x = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.longest_axis(), 0);

        let aabb_y = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.longest_axis(), 1);

        let aabb_z = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.longest_axis(), 2);
    }

    #[test]
    fn test_bounding_cube() {
        let aabb = Aabb::from_points(Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 2.0, 1.0));
        let cube = aabb.bounding_cube(0.5);

        assert_eq!(cube.centroid(), Vec3::new(2.0, 1.0, 0.5));
        assert!((cube.x.size() - 5.0).abs() < 1e-6);
        assert!((cube.y.size() - 5.0).abs() < 1e-6);
        assert!((cube.z.size() - 5.0).abs() < 1e-6);
        for corner in aabb.corners() {
            assert!(cube.contains_point(corner));
        }
    }

    #[test]
    fn test_corners_bit_pattern() {
        let aabb = Aabb::from_points(Vec3::ZERO, Vec3::ONE);
        let corners = aabb.corners();

        assert_eq!(corners[0], Vec3::ZERO);
        assert_eq!(corners[1], Vec3::X);
        assert_eq!(corners[2], Vec3::Y);
        assert_eq!(corners[4], Vec3::Z);
        assert_eq!(corners[7], Vec3::ONE);
    }
}
