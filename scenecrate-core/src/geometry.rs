//! Planes, rays and intersection tests

use serde::{Deserialize, Serialize};

use crate::point::*;

const EPSILON: f32 = 1e-6;

/// An infinite plane through `origin` with unit `normal`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    origin: Point3f,
    normal: Vector3f,
}

impl Plane {
    /// Create a plane; `None` if `normal` is zero-length or not finite
    pub fn new(origin: Point3f, normal: Vector3f) -> Option<Self> {
        let len = normal.norm();
        if !len.is_finite() || len < EPSILON || !origin.coords.iter().all(|c| c.is_finite()) {
            return None;
        }
        Some(Self {
            origin,
            normal: normal / len,
        })
    }

    /// Plane through three points; `None` if they are collinear
    pub fn from_points(a: &Point3f, b: &Point3f, c: &Point3f) -> Option<Self> {
        Self::new(*a, (b - a).cross(&(c - a)))
    }

    pub fn origin(&self) -> Point3f {
        self.origin
    }

    pub fn normal(&self) -> Vector3f {
        self.normal
    }

    pub fn signed_distance(&self, point: &Point3f) -> f32 {
        self.normal.dot(&(point - self.origin))
    }

    /// Orthogonal projection of `point` onto the plane; `None` for non-finite input
    pub fn project(&self, point: &Point3f) -> Option<Point3f> {
        let projected = point - self.normal * self.signed_distance(point);
        projected
            .coords
            .iter()
            .all(|c| c.is_finite())
            .then_some(projected)
    }

    /// Mirror image of `point`
    pub fn reflect_point(&self, point: &Point3f) -> Option<Point3f> {
        let foot = self.project(point)?;
        Some(foot + (foot - point))
    }

    /// Mirror image of a direction vector
    pub fn reflect_vector(&self, vector: &Vector3f) -> Vector3f {
        vector - self.normal * (2.0 * self.normal.dot(vector))
    }
}

/// A half-line starting at `origin`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Point3f,
    pub direction: Vector3f,
}

impl Ray {
    pub fn new(origin: Point3f, direction: Vector3f) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3f {
        self.origin + self.direction * t
    }

    /// Transform origin and direction by an affine matrix
    pub fn transformed(&self, matrix: &nalgebra::Matrix4<f32>) -> Ray {
        Ray {
            origin: matrix.transform_point(&self.origin),
            direction: matrix.transform_vector(&self.direction),
        }
    }
}

/// Möller–Trumbore ray/triangle test.
///
/// Returns the ray parameter `t >= 0` of the hit, in units of `ray.direction`. `None`
/// when the ray is parallel to the triangle, misses it, or the triangle is behind the
/// ray origin.
pub fn ray_triangle(ray: &Ray, a: &Point3f, b: &Point3f, c: &Point3f) -> Option<f32> {
    let edge1 = b - a;
    let edge2 = c - a;
    let h = ray.direction.cross(&edge2);
    let det = edge1.dot(&h);
    if det.abs() < EPSILON * edge1.norm() * edge2.norm() * ray.direction.norm() {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - a;
    let u = inv_det * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(&edge1);
    let v = inv_det * ray.direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = inv_det * edge2.dot(&q);
    (t >= 0.0).then_some(t)
}

/// Intersection segment of two triangles.
///
/// Endpoints are ordered by increasing parameter along `n_a × n_b`. `None` if either
/// triangle is degenerate, the planes are parallel or coplanar, or the triangles do not
/// overlap on the common line.
pub fn triangle_triangle(a: &[Point3f; 3], b: &[Point3f; 3]) -> Option<(Point3f, Point3f)> {
    let plane_a = Plane::from_points(&a[0], &a[1], &a[2])?;
    let plane_b = Plane::from_points(&b[0], &b[1], &b[2])?;

    let direction = plane_a.normal().cross(&plane_b.normal());
    if direction.norm() < EPSILON {
        return None;
    }

    let (a_min, a_max) = plane_crossing(a, &plane_b, &direction)?;
    let (b_min, b_max) = plane_crossing(b, &plane_a, &direction)?;

    let start = if a_min.0 >= b_min.0 { a_min } else { b_min };
    let end = if a_max.0 <= b_max.0 { a_max } else { b_max };
    if start.0 > end.0 + EPSILON {
        return None;
    }
    Some((start.1, end.1))
}

/// Where a triangle crosses a plane, as the extreme points along `direction`
fn plane_crossing(
    triangle: &[Point3f; 3],
    plane: &Plane,
    direction: &Vector3f,
) -> Option<((f32, Point3f), (f32, Point3f))> {
    let d = triangle.map(|p| plane.signed_distance(&p));
    if d.iter().all(|&x| x > EPSILON) || d.iter().all(|&x| x < -EPSILON) {
        return None;
    }

    let mut points = Vec::with_capacity(3);
    for i in 0..3 {
        let j = (i + 1) % 3;
        if d[i].abs() <= EPSILON {
            points.push(triangle[i]);
        } else if d[j].abs() > EPSILON && d[i] * d[j] < 0.0 {
            let s = d[i] / (d[i] - d[j]);
            points.push(triangle[i] + (triangle[j] - triangle[i]) * s);
        }
    }

    let mut iter = points.into_iter().map(|p| (direction.dot(&p.coords), p));
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), item| {
        (
            if item.0 < lo.0 { item } else { lo },
            if item.0 > hi.0 { item } else { hi },
        )
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plane_rejects_degenerate_normal() {
        assert!(Plane::new(Point3f::origin(), Vector3f::zeros()).is_none());
        assert!(Plane::new(Point3f::origin(), Vector3f::new(f32::NAN, 0.0, 1.0)).is_none());
        assert!(Plane::from_points(
            &Point3f::new(0.0, 0.0, 0.0),
            &Point3f::new(1.0, 1.0, 1.0),
            &Point3f::new(2.0, 2.0, 2.0),
        )
        .is_none());
    }

    #[test]
    fn test_reflection() {
        let plane = Plane::new(Point3f::new(1.0, 0.0, 0.0), Vector3f::new(2.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(plane.normal(), Vector3f::x());
        let p = plane.reflect_point(&Point3f::new(3.0, 2.0, -1.0)).unwrap();
        assert_relative_eq!(p, Point3f::new(-1.0, 2.0, -1.0));
        let v = plane.reflect_vector(&Vector3f::new(1.0, 1.0, 0.0));
        assert_relative_eq!(v, Vector3f::new(-1.0, 1.0, 0.0));
        assert!(plane
            .project(&Point3f::new(f32::INFINITY, 0.0, 0.0))
            .is_none());
    }

    #[test]
    fn test_ray_triangle_hit_and_miss() {
        let a = Point3f::new(0.0, 0.0, 0.0);
        let b = Point3f::new(1.0, 0.0, 0.0);
        let c = Point3f::new(0.0, 1.0, 0.0);

        let ray = Ray::new(Point3f::new(0.25, 0.25, 5.0), Vector3f::new(0.0, 0.0, -1.0));
        let t = ray_triangle(&ray, &a, &b, &c).unwrap();
        assert_relative_eq!(t, 5.0, epsilon = 1e-5);
        assert_relative_eq!(ray.at(t), Point3f::new(0.25, 0.25, 0.0), epsilon = 1e-5);

        let miss = Ray::new(Point3f::new(0.9, 0.9, 5.0), Vector3f::new(0.0, 0.0, -1.0));
        assert!(ray_triangle(&miss, &a, &b, &c).is_none());

        let behind = Ray::new(Point3f::new(0.25, 0.25, 5.0), Vector3f::new(0.0, 0.0, 1.0));
        assert!(ray_triangle(&behind, &a, &b, &c).is_none());

        let parallel = Ray::new(Point3f::new(0.25, 0.25, 5.0), Vector3f::new(1.0, 0.0, 0.0));
        assert!(ray_triangle(&parallel, &a, &b, &c).is_none());
    }

    #[test]
    fn test_triangle_triangle_fixture() {
        let a = [
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(2.0, 0.0, 0.0),
            Point3f::new(0.0, 2.0, 0.0),
        ];
        let b = [
            Point3f::new(0.5, -1.0, -1.0),
            Point3f::new(0.5, 3.0, -1.0),
            Point3f::new(0.5, 1.0, 1.0),
        ];
        let (start, end) = triangle_triangle(&a, &b).unwrap();
        assert_relative_eq!(start, Point3f::new(0.5, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(end, Point3f::new(0.5, 1.5, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_triangle_triangle_none_cases() {
        let a = [
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ];
        // parallel, offset
        let lifted = a.map(|p| p + Vector3f::new(0.0, 0.0, 1.0));
        assert!(triangle_triangle(&a, &lifted).is_none());
        // coplanar
        assert!(triangle_triangle(&a, &a).is_none());
        // planes cross but triangles are apart
        let far = [
            Point3f::new(5.0, -1.0, -1.0),
            Point3f::new(5.0, 1.0, -1.0),
            Point3f::new(5.0, 0.0, 1.0),
        ];
        assert!(triangle_triangle(&a, &far).is_none());
    }
}
