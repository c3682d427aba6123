//! Bounding boxes, optionally relative to a coordinate system

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::point::*;

/// An axis-aligned bounding box.
///
/// A box may carry a coordinate system (`cs`). Points inserted into such a box are given
/// in world coordinates and mapped into the CS frame first, so `min`/`max` are expressed
/// in that frame. A box without a CS is a plain world-axis box.
///
/// A freshly created box is empty: it bounds nothing and `min`/`max` return `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    cs: Option<CoordinateSystem>,
    bounds: Option<(Point3f, Point3f)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CoordinateSystem {
    to_world: Matrix4<f32>,
    to_local: Matrix4<f32>,
}

impl BBox {
    /// Create an empty world-axis box
    pub fn new() -> Self {
        Self {
            cs: None,
            bounds: None,
        }
    }

    /// Create an empty box relative to the given coordinate system.
    ///
    /// Returns `None` if `cs` is not invertible.
    pub fn with_cs(cs: Matrix4<f32>) -> Option<Self> {
        let to_local = cs.try_inverse()?;
        Some(Self {
            cs: Some(CoordinateSystem {
                to_world: cs,
                to_local,
            }),
            bounds: None,
        })
    }

    /// Create a world-axis box bounding all the given points
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut bbox = Self::new();
        for p in points {
            bbox.insert_point(p);
        }
        bbox
    }

    /// The coordinate system this box is relative to, if any
    pub fn cs(&self) -> Option<&Matrix4<f32>> {
        self.cs.as_ref().map(|cs| &cs.to_world)
    }

    /// Whether the box bounds no point at all
    pub fn is_empty(&self) -> bool {
        self.bounds.is_none()
    }

    /// Grow the box to include a world-space point
    pub fn insert_point(&mut self, point: &Point3f) {
        let p = match &self.cs {
            Some(cs) => cs.to_local.transform_point(point),
            None => *point,
        };
        self.bounds = Some(match self.bounds {
            None => (p, p),
            Some((min, max)) => (
                Point3f::from(min.coords.inf(&p.coords)),
                Point3f::from(max.coords.sup(&p.coords)),
            ),
        });
    }

    /// Grow the box to include another box.
    ///
    /// If the two boxes have different coordinate systems the corners of `other` are
    /// inserted as world points, which may grow the box beyond `other`'s exact extent.
    pub fn union(&mut self, other: &BBox) {
        let Some((omin, omax)) = other.bounds else {
            return;
        };
        if self.cs == other.cs {
            self.bounds = Some(match self.bounds {
                None => (omin, omax),
                Some((min, max)) => (
                    Point3f::from(min.coords.inf(&omin.coords)),
                    Point3f::from(max.coords.sup(&omax.coords)),
                ),
            });
        } else {
            for corner in other.world_corners() {
                self.insert_point(&corner);
            }
        }
    }

    /// Return a new world-axis box bounding this box's corners after transformation
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> BBox {
        let mut result = BBox::new();
        for corner in self.world_corners() {
            result.insert_point(&matrix.transform_point(&corner));
        }
        result
    }

    /// Minimum corner, in the box's frame
    pub fn min(&self) -> Option<Point3f> {
        self.bounds.map(|(min, _)| min)
    }

    /// Maximum corner, in the box's frame
    pub fn max(&self) -> Option<Point3f> {
        self.bounds.map(|(_, max)| max)
    }

    /// Extent along each axis; zero for an empty box
    pub fn size(&self) -> Vector3f {
        match self.bounds {
            Some((min, max)) => max - min,
            None => Vector3f::zeros(),
        }
    }

    /// Center point in world space
    pub fn center(&self) -> Option<Point3f> {
        let (min, max) = self.bounds?;
        let local = nalgebra::center(&min, &max);
        Some(match &self.cs {
            Some(cs) => cs.to_world.transform_point(&local),
            None => local,
        })
    }

    /// The eight corners in the box's frame
    pub fn corners(&self) -> Vec<Point3f> {
        let Some((min, max)) = self.bounds else {
            return Vec::new();
        };
        let mut corners = Vec::with_capacity(8);
        for &x in &[min.x, max.x] {
            for &y in &[min.y, max.y] {
                for &z in &[min.z, max.z] {
                    corners.push(Point3f::new(x, y, z));
                }
            }
        }
        corners
    }

    /// The eight corners mapped back to world space
    pub fn world_corners(&self) -> Vec<Point3f> {
        let corners = self.corners();
        match &self.cs {
            Some(cs) => corners
                .iter()
                .map(|c| cs.to_world.transform_point(c))
                .collect(),
            None => corners,
        }
    }

    /// True if the box is empty or flat along at least one axis
    pub fn is_degenerate(&self, tolerance: f32) -> bool {
        if self.is_empty() {
            return true;
        }
        let size = self.size();
        size.x <= tolerance || size.y <= tolerance || size.z <= tolerance
    }

    /// Return a copy whose every axis spans at least `min_extent`, padding flat axes
    /// symmetrically about their center
    pub fn inflated(&self, min_extent: f32) -> BBox {
        let mut result = self.clone();
        if let Some((mut min, mut max)) = self.bounds {
            for axis in 0..3 {
                let extent = max[axis] - min[axis];
                if extent < min_extent {
                    let pad = (min_extent - extent) * 0.5;
                    min[axis] -= pad;
                    max[axis] += pad;
                }
            }
            result.bounds = Some((min, max));
        }
        result
    }

    /// Whether a world-space point lies inside the box (boundary included)
    pub fn contains(&self, point: &Point3f) -> bool {
        let Some((min, max)) = self.bounds else {
            return false;
        };
        let p = match &self.cs {
            Some(cs) => cs.to_local.transform_point(point),
            None => *point,
        };
        (0..3).all(|i| p[i] >= min[i] && p[i] <= max[i])
    }

    /// Length of the box diagonal; zero for an empty box
    pub fn diagonal(&self) -> f32 {
        self.size().norm()
    }
}

impl Default for BBox {
    fn default() -> Self {
        Self::new()
    }
}
