//! Point, line and triangle primitives

use std::fmt;

use nalgebra::Unit;
use serde::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::{Error, Result};
use crate::figure::{AnyFigure, Figure, FigureId};
use crate::geometry::{self, Plane, Ray};
use crate::point::*;
use crate::vertex::{Vertex, VertexSlot};

/// The three primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Point,
    Line,
    Triangle,
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PrimitiveKind::Point => "point",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Triangle => "triangle",
        };
        f.write_str(name)
    }
}

/// Behaviour shared by every primitive kind.
///
/// Primitives own their vertices through [`VertexSlot`]s. A primitive is not `Clone`:
/// attached slots hold manager handles, so use [`Primitive::detached_copy`] instead.
pub trait Primitive: Sized + fmt::Debug + Send + Sync {
    const KIND: PrimitiveKind;

    /// Per-figure settings for figures holding this primitive kind
    type FigureSettings: Default + Clone + fmt::Debug + Send + Sync;

    fn slots(&self) -> &[VertexSlot];
    fn slots_mut(&mut self) -> &mut [VertexSlot];

    /// Draw order within the figure; higher is drawn first
    fn order(&self) -> i32;
    fn set_order(&mut self, order: i32);

    /// The figure this primitive belongs to, if it has been added to a registered one
    fn parent(&self) -> Option<FigureId>;
    #[doc(hidden)]
    fn set_parent(&mut self, parent: Option<FigureId>);

    /// New detached primitive reflected about `plane`; `None` if any vertex fails to
    /// mirror
    fn mirrored(&self, plane: &Plane) -> Option<Self>;

    /// Deep copy with detached vertices and no parent
    fn detached_copy(&self) -> Self;

    #[doc(hidden)]
    fn figure_of(figure: &AnyFigure) -> Option<&Figure<Self>>;
    #[doc(hidden)]
    fn figure_of_mut(figure: &mut AnyFigure) -> Option<&mut Figure<Self>>;

    /// Adjust vertex content according to figure settings before the primitive is stored
    fn prepare(&mut self, _settings: &Self::FigureSettings) -> Result<()> {
        Ok(())
    }

    fn vertices(&self) -> Vec<&Vertex> {
        self.slots().iter().map(VertexSlot::vertex).collect()
    }

    fn bbox(&self) -> BBox {
        let mut bbox = BBox::new();
        for slot in self.slots() {
            bbox.insert_point(&slot.vertex().position);
        }
        bbox
    }

    fn is_attached(&self) -> bool {
        self.slots().iter().any(VertexSlot::is_attached)
    }

    /// Manager indices of all corners; `None` unless every corner is attached
    fn indexes(&self) -> Option<Vec<u32>> {
        self.slots().iter().map(|s| s.index().map(|i| i.0)).collect()
    }
}

fn mirror_slots<const N: usize>(slots: &[VertexSlot; N], plane: &Plane) -> Option<[Vertex; N]> {
    let mirrored: Option<Vec<Vertex>> = slots.iter().map(|s| s.vertex().mirrored(plane)).collect();
    mirrored?.try_into().ok()
}

/// A single-vertex primitive
#[derive(Debug)]
pub struct Point {
    slots: [VertexSlot; 1],
    order: i32,
    parent: Option<FigureId>,
}

impl Point {
    pub fn new(vertex: impl Into<Vertex>) -> Self {
        Self {
            slots: [VertexSlot::Detached(vertex.into())],
            order: 0,
            parent: None,
        }
    }

    pub fn vertex(&self) -> &Vertex {
        self.slots[0].vertex()
    }
}

impl Primitive for Point {
    const KIND: PrimitiveKind = PrimitiveKind::Point;
    type FigureSettings = ();

    fn figure_of(figure: &AnyFigure) -> Option<&Figure<Self>> {
        match figure {
            AnyFigure::Points(f) => Some(f),
            _ => None,
        }
    }

    fn figure_of_mut(figure: &mut AnyFigure) -> Option<&mut Figure<Self>> {
        match figure {
            AnyFigure::Points(f) => Some(f),
            _ => None,
        }
    }

    fn slots(&self) -> &[VertexSlot] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut [VertexSlot] {
        &mut self.slots
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    fn parent(&self) -> Option<FigureId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<FigureId>) {
        self.parent = parent;
    }

    fn mirrored(&self, plane: &Plane) -> Option<Self> {
        let [v] = mirror_slots(&self.slots, plane)?;
        Some(Point {
            order: self.order,
            ..Point::new(v)
        })
    }

    fn detached_copy(&self) -> Self {
        Point {
            order: self.order,
            ..Point::new(self.vertex().clone())
        }
    }
}

/// A two-vertex primitive from `from` to `to`
#[derive(Debug)]
pub struct Line {
    slots: [VertexSlot; 2],
    order: i32,
    parent: Option<FigureId>,
}

impl Line {
    pub fn new(from: impl Into<Vertex>, to: impl Into<Vertex>) -> Self {
        Self {
            slots: [
                VertexSlot::Detached(from.into()),
                VertexSlot::Detached(to.into()),
            ],
            order: 0,
            parent: None,
        }
    }

    pub fn from(&self) -> &Vertex {
        self.slots[0].vertex()
    }

    pub fn to(&self) -> &Vertex {
        self.slots[1].vertex()
    }

    /// Unit direction from `from` to `to`
    pub fn direction(&self) -> Result<Unit<Vector3f>> {
        Unit::try_new(self.to().position - self.from().position, f32::EPSILON)
            .ok_or(Error::ZeroLengthPrimitive)
    }

    /// Build the two triangles of a `width`-wide band along the line, facing `view_dir`.
    ///
    /// Fails with [`Error::ZeroLengthPrimitive`] for a zero-length line and with
    /// [`Error::DegenerateGeometry`] when the line points along `view_dir`.
    pub fn extrude(&self, width: f32, view_dir: &Vector3f) -> Result<[Triangle; 2]> {
        let direction = self.direction()?;
        let side = Unit::try_new(direction.cross(view_dir), f32::EPSILON).ok_or_else(|| {
            Error::DegenerateGeometry("line is parallel to the view direction".into())
        })?;
        let offset = side.into_inner() * (width * 0.5);

        let corner = |v: &Vertex, sign: f32| Vertex {
            position: v.position + offset * sign,
            ..v.clone()
        };
        let (from, to) = (self.from(), self.to());
        Ok([
            Triangle::new(corner(from, -1.0), corner(to, -1.0), corner(to, 1.0)),
            Triangle::new(corner(from, -1.0), corner(to, 1.0), corner(from, 1.0)),
        ])
    }
}

impl Primitive for Line {
    const KIND: PrimitiveKind = PrimitiveKind::Line;
    type FigureSettings = ();

    fn figure_of(figure: &AnyFigure) -> Option<&Figure<Self>> {
        match figure {
            AnyFigure::Lines(f) => Some(f),
            _ => None,
        }
    }

    fn figure_of_mut(figure: &mut AnyFigure) -> Option<&mut Figure<Self>> {
        match figure {
            AnyFigure::Lines(f) => Some(f),
            _ => None,
        }
    }

    fn slots(&self) -> &[VertexSlot] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut [VertexSlot] {
        &mut self.slots
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    fn parent(&self) -> Option<FigureId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<FigureId>) {
        self.parent = parent;
    }

    fn mirrored(&self, plane: &Plane) -> Option<Self> {
        let [from, to] = mirror_slots(&self.slots, plane)?;
        Some(Line {
            order: self.order,
            ..Line::new(from, to)
        })
    }

    fn detached_copy(&self) -> Self {
        Line {
            order: self.order,
            ..Line::new(self.from().clone(), self.to().clone())
        }
    }
}

/// How a triangle figure assigns vertex normals
#[derive(Clone, Copy, Debug, Default)]
pub enum NormalStrategy {
    /// Every corner gets the face normal `normalize(cross(V2 - V1, V3 - V1))`
    #[default]
    Cross,
    /// Every corner gets the normal computed by the given function
    Custom(fn(&Triangle) -> Vector3f),
    /// Face normals averaged over all coincident vertices of the figure
    Mean,
    /// Normals supplied with the vertices are kept as they are
    Explicit,
}

/// Settings of a triangle figure
#[derive(Clone, Debug, Default)]
pub struct TriangleSettings {
    pub normal_strategy: NormalStrategy,
}

/// A three-vertex primitive
#[derive(Debug)]
pub struct Triangle {
    slots: [VertexSlot; 3],
    order: i32,
    parent: Option<FigureId>,
}

impl Triangle {
    pub fn new(v1: impl Into<Vertex>, v2: impl Into<Vertex>, v3: impl Into<Vertex>) -> Self {
        Self {
            slots: [
                VertexSlot::Detached(v1.into()),
                VertexSlot::Detached(v2.into()),
                VertexSlot::Detached(v3.into()),
            ],
            order: 0,
            parent: None,
        }
    }

    pub fn v1(&self) -> &Vertex {
        self.slots[0].vertex()
    }

    pub fn v2(&self) -> &Vertex {
        self.slots[1].vertex()
    }

    pub fn v3(&self) -> &Vertex {
        self.slots[2].vertex()
    }

    pub fn positions(&self) -> [Point3f; 3] {
        [self.v1().position, self.v2().position, self.v3().position]
    }

    /// `normalize(cross(V2 - V1, V3 - V1))`; `None` for a degenerate triangle
    pub fn face_normal(&self) -> Option<Vector3f> {
        let [a, b, c] = self.positions();
        Unit::try_new((b - a).cross(&(c - a)), f32::EPSILON).map(Unit::into_inner)
    }

    pub fn area(&self) -> f32 {
        let [a, b, c] = self.positions();
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// Ray parameter of the hit point, if the ray hits this triangle
    pub fn intersect_ray(&self, ray: &Ray) -> Option<f32> {
        let [a, b, c] = self.positions();
        geometry::ray_triangle(ray, &a, &b, &c)
    }

    /// Segment along which this triangle crosses `other`
    pub fn intersect_triangle(&self, other: &Triangle) -> Option<(Point3f, Point3f)> {
        geometry::triangle_triangle(&self.positions(), &other.positions())
    }

    /// Set all three corner normals; only possible while detached
    pub fn set_normals(&mut self, normal: Vector3f) -> Result<()> {
        for slot in &mut self.slots {
            slot.vertex_mut()?.normal = normal;
        }
        Ok(())
    }
}

impl Primitive for Triangle {
    const KIND: PrimitiveKind = PrimitiveKind::Triangle;
    type FigureSettings = TriangleSettings;

    fn figure_of(figure: &AnyFigure) -> Option<&Figure<Self>> {
        match figure {
            AnyFigure::Triangles(f) => Some(f),
            _ => None,
        }
    }

    fn figure_of_mut(figure: &mut AnyFigure) -> Option<&mut Figure<Self>> {
        match figure {
            AnyFigure::Triangles(f) => Some(f),
            _ => None,
        }
    }

    fn slots(&self) -> &[VertexSlot] {
        &self.slots
    }

    fn slots_mut(&mut self) -> &mut [VertexSlot] {
        &mut self.slots
    }

    fn order(&self) -> i32 {
        self.order
    }

    fn set_order(&mut self, order: i32) {
        self.order = order;
    }

    fn parent(&self) -> Option<FigureId> {
        self.parent
    }

    fn set_parent(&mut self, parent: Option<FigureId>) {
        self.parent = parent;
    }

    fn mirrored(&self, plane: &Plane) -> Option<Self> {
        // Reflection flips handedness; swapping V2/V3 keeps the winding consistent
        // with the reflected normals.
        let [v1, v2, v3] = mirror_slots(&self.slots, plane)?;
        Some(Triangle {
            order: self.order,
            ..Triangle::new(v1, v3, v2)
        })
    }

    fn detached_copy(&self) -> Self {
        Triangle {
            order: self.order,
            ..Triangle::new(self.v1().clone(), self.v2().clone(), self.v3().clone())
        }
    }

    fn prepare(&mut self, settings: &TriangleSettings) -> Result<()> {
        let normal = match settings.normal_strategy {
            NormalStrategy::Cross | NormalStrategy::Mean => self.face_normal(),
            NormalStrategy::Custom(f) => Some(f(self)),
            NormalStrategy::Explicit => None,
        };
        match normal {
            Some(n) => self.set_normals(n),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn test_face_normal() {
        let tri = unit_triangle();
        assert_relative_eq!(tri.face_normal().unwrap(), Vector3f::z());
        assert_relative_eq!(tri.area(), 0.5);

        let flat = Triangle::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 1.0, 1.0),
            Point3f::new(2.0, 2.0, 2.0),
        );
        assert!(flat.face_normal().is_none());
    }

    #[test]
    fn test_prepare_strategies() {
        let mut tri = unit_triangle();
        tri.set_normals(Vector3f::x()).unwrap();

        tri.prepare(&TriangleSettings {
            normal_strategy: NormalStrategy::Explicit,
        })
        .unwrap();
        assert_eq!(tri.v1().normal, Vector3f::x());

        tri.prepare(&TriangleSettings::default()).unwrap();
        for v in tri.vertices() {
            assert_relative_eq!(v.normal, Vector3f::z());
        }

        fn down(_: &Triangle) -> Vector3f {
            -Vector3f::y()
        }
        tri.prepare(&TriangleSettings {
            normal_strategy: NormalStrategy::Custom(down),
        })
        .unwrap();
        assert_eq!(tri.v3().normal, -Vector3f::y());
    }

    #[test]
    fn test_line_zero_length_fails_loudly() {
        let line = Line::new(Point3f::new(1.0, 1.0, 1.0), Point3f::new(1.0, 1.0, 1.0));
        assert_eq!(line.direction().unwrap_err(), Error::ZeroLengthPrimitive);
        assert_eq!(
            line.extrude(2.0, &Vector3f::z()).unwrap_err(),
            Error::ZeroLengthPrimitive
        );
    }

    #[test]
    fn test_line_extrude() {
        let line = Line::new(Point3f::new(0.0, 0.0, 0.0), Point3f::new(4.0, 0.0, 0.0));
        let [a, b] = line.extrude(2.0, &Vector3f::z()).unwrap();
        let total = a.area() + b.area();
        assert_relative_eq!(total, 8.0, epsilon = 1e-5);
        let bbox = {
            let mut bbox = a.bbox();
            bbox.union(&b.bbox());
            bbox
        };
        assert_relative_eq!(bbox.size(), Vector3f::new(4.0, 2.0, 0.0), epsilon = 1e-5);

        assert!(matches!(
            line.extrude(2.0, &Vector3f::x()),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_mirror_triangle_keeps_winding() {
        let tri = unit_triangle();
        let plane = Plane::new(Point3f::new(0.0, 0.0, 1.0), Vector3f::z()).unwrap();
        let mirrored = tri.mirrored(&plane).unwrap();

        assert_relative_eq!(mirrored.v1().position, Point3f::new(0.0, 0.0, 2.0));
        assert_relative_eq!(mirrored.v2().position, Point3f::new(0.0, 1.0, 2.0));
        assert_relative_eq!(mirrored.v3().position, Point3f::new(1.0, 0.0, 2.0));
        assert_relative_eq!(mirrored.face_normal().unwrap(), -Vector3f::z());
        assert!(!mirrored.is_attached());
        assert!(mirrored.parent().is_none());
    }

    #[test]
    fn test_intersect_triangle() {
        let tri = unit_triangle();
        let upright = Triangle::new(
            Point3f::new(0.2, -1.0, -1.0),
            Point3f::new(0.2, 2.0, -1.0),
            Point3f::new(0.2, 0.5, 2.0),
        );
        let (start, end) = tri.intersect_triangle(&upright).unwrap();
        assert_relative_eq!(start, Point3f::new(0.2, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(end, Point3f::new(0.2, 0.8, 0.0), epsilon = 1e-5);

        let shifted = Triangle::new(
            Point3f::new(0.5, 0.5, 0.0),
            Point3f::new(1.5, 0.5, 0.0),
            Point3f::new(0.5, 1.5, 0.0),
        );
        assert!(tri.intersect_triangle(&shifted).is_none());

        let lifted = Triangle::new(
            Point3f::new(0.0, 0.0, 1.0),
            Point3f::new(1.0, 0.0, 1.0),
            Point3f::new(0.0, 1.0, 1.0),
        );
        assert!(tri.intersect_triangle(&lifted).is_none());

        let far = Triangle::new(
            Point3f::new(5.0, -1.0, -1.0),
            Point3f::new(5.0, 2.0, -1.0),
            Point3f::new(5.0, 0.5, 2.0),
        );
        assert!(tri.intersect_triangle(&far).is_none());
    }

    #[test]
    fn test_mirror_point_and_line() {
        let plane = Plane::new(Point3f::origin(), Vector3f::x()).unwrap();
        let point = Point::new(Point3f::new(2.0, 1.0, 0.0));
        assert_relative_eq!(
            point.mirrored(&plane).unwrap().vertex().position,
            Point3f::new(-2.0, 1.0, 0.0)
        );

        let line = Line::new(Point3f::new(1.0, 0.0, 0.0), Point3f::new(3.0, 0.0, 0.0));
        let mirrored = line.mirrored(&plane).unwrap();
        assert_relative_eq!(mirrored.from().position, Point3f::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(mirrored.to().position, Point3f::new(-3.0, 0.0, 0.0));
    }

    #[test]
    fn test_mirror_fails_for_unprojectable_vertex() {
        let plane = Plane::new(Point3f::origin(), Vector3f::x()).unwrap();
        let tri = Triangle::new(
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(f32::INFINITY, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        );
        assert!(tri.mirrored(&plane).is_none());
    }

    #[test]
    fn test_detached_copy_keeps_content_and_order() {
        let mut tri = unit_triangle();
        tri.set_order(4);
        let copy = tri.detached_copy();
        assert_eq!(copy.order(), 4);
        assert_eq!(copy.positions(), tri.positions());
    }
}
