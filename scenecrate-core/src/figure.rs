//! Figures: named, transformable groups of same-kind primitives

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::{Error, Result};
use crate::geometry::Plane;
use crate::manager::BBoxPolicy;
use crate::primitive::*;
use crate::vertex::VertexSlot;

/// Identifier of a figure registered with a [`VertexManager`](crate::manager::VertexManager)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FigureId(pub(crate) u64);

impl fmt::Display for FigureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "figure#{}", self.0)
    }
}

/// Opaque user data attached to a figure
pub type Tag = Arc<dyn Any + Send + Sync>;

/// A named, ordered collection of primitives of kind `P`.
///
/// Every state change bumps the figure's revision, so a consumer can poll
/// [`Figure::changed_since`] instead of subscribing to notifications.
pub struct Figure<P: Primitive> {
    id: Option<FigureId>,
    name: String,
    primitives: Vec<P>,
    object_matrix: Matrix4<f32>,
    visible: bool,
    order: i32,
    tag: Option<Tag>,
    screen_coords: bool,
    highlighted: bool,
    expand_bbox: bool,
    settings: P::FigureSettings,
    revision: u64,
}

pub type PointFigure = Figure<Point>;
pub type LineFigure = Figure<Line>;
pub type TriangleFigure = Figure<Triangle>;

impl<P: Primitive> Figure<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            primitives: Vec::new(),
            object_matrix: Matrix4::identity(),
            visible: true,
            order: 0,
            tag: None,
            screen_coords: false,
            highlighted: false,
            expand_bbox: true,
            settings: P::FigureSettings::default(),
            revision: 0,
        }
    }

    /// Create a figure holding `primitives`
    pub fn with_primitives(
        name: impl Into<String>,
        primitives: impl IntoIterator<Item = P>,
    ) -> Result<Self> {
        let mut figure = Self::new(name);
        for p in primitives {
            figure.push(p)?;
        }
        Ok(figure)
    }

    /// Set while the figure is registered with a manager
    pub fn id(&self) -> Option<FigureId> {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: Option<FigureId>) {
        self.id = id;
        for p in &mut self.primitives {
            p.set_parent(id);
        }
        self.touch();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn primitives(&self) -> &[P] {
        &self.primitives
    }

    pub(crate) fn primitives_mut(&mut self) -> &mut Vec<P> {
        &mut self.primitives
    }

    pub fn primitive(&self, index: usize) -> Option<&P> {
        self.primitives.get(index)
    }

    pub fn len(&self) -> usize {
        self.primitives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primitives.is_empty()
    }

    /// Append a detached primitive.
    ///
    /// The figure's settings are applied to the primitive first (for triangle figures
    /// this assigns normals). Fails with [`Error::VertexAlreadyAttached`] if any vertex of
    /// `primitive` is attached to a manager.
    pub fn push(&mut self, mut primitive: P) -> Result<()> {
        if primitive.is_attached() {
            return Err(Error::VertexAlreadyAttached);
        }
        primitive.prepare(&self.settings)?;
        primitive.set_parent(self.id);
        self.primitives.push(primitive);
        self.touch();
        Ok(())
    }

    /// Remove and return a primitive of an unregistered figure
    pub fn remove(&mut self, index: usize) -> Option<P> {
        if index >= self.primitives.len() || self.primitives[index].is_attached() {
            return None;
        }
        let mut primitive = self.primitives.remove(index);
        primitive.set_parent(None);
        self.touch();
        Some(primitive)
    }

    /// Transform from object space to local space; not baked into vertex positions
    pub fn object_matrix(&self) -> &Matrix4<f32> {
        &self.object_matrix
    }

    pub fn set_object_matrix(&mut self, matrix: Matrix4<f32>) {
        self.object_matrix = matrix;
        self.touch();
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.touch();
    }

    /// Draw priority; higher orders are drawn first
    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn set_order(&mut self, order: i32) {
        self.order = order;
        self.touch();
    }

    pub fn tag(&self) -> Option<&Tag> {
        self.tag.as_ref()
    }

    pub fn set_tag(&mut self, tag: Option<Tag>) {
        self.tag = tag;
        self.touch();
    }

    /// Whether vertex positions are pixels rather than model coordinates
    pub fn screen_coords(&self) -> bool {
        self.screen_coords
    }

    pub fn set_screen_coords(&mut self, screen_coords: bool) {
        self.screen_coords = screen_coords;
        self.touch();
    }

    pub fn highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        self.highlighted = highlighted;
        self.touch();
    }

    /// Whether this figure contributes to the manager's aggregate bounding box
    pub fn expand_bbox(&self) -> bool {
        self.expand_bbox
    }

    pub fn set_expand_bbox(&mut self, expand_bbox: bool) {
        self.expand_bbox = expand_bbox;
        self.touch();
    }

    pub fn settings(&self) -> &P::FigureSettings {
        &self.settings
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn changed_since(&self, revision: u64) -> bool {
        self.revision != revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    /// How vertices of this figure should affect the manager's bounding box
    pub fn bbox_policy(&self) -> BBoxPolicy {
        if self.screen_coords || !self.expand_bbox {
            BBoxPolicy::Ignore
        } else if self.object_matrix == Matrix4::identity() {
            BBoxPolicy::Raw
        } else {
            BBoxPolicy::Transformed(self.object_matrix)
        }
    }

    /// Bounding box in object space
    pub fn bbox(&self) -> BBox {
        let mut bbox = BBox::new();
        for p in &self.primitives {
            bbox.union(&p.bbox());
        }
        bbox
    }

    /// Bounding box of the vertices after applying the object matrix
    pub fn local_bbox(&self) -> BBox {
        let mut bbox = BBox::new();
        for p in &self.primitives {
            for v in p.vertices() {
                bbox.insert_point(&self.object_matrix.transform_point(&v.position));
            }
        }
        bbox
    }

    /// Manager indices in draw order: primitives with higher order first, ties in
    /// insertion order. Detached primitives are skipped.
    pub fn indexes(&self) -> Vec<u32> {
        let mut order: Vec<usize> = (0..self.primitives.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(self.primitives[i].order()));
        order
            .into_iter()
            .filter_map(|i| self.primitives[i].indexes())
            .flatten()
            .collect()
    }

    fn copy_with(&self, primitives: Vec<P>) -> Self {
        Self {
            id: None,
            name: self.name.clone(),
            primitives,
            object_matrix: self.object_matrix,
            visible: self.visible,
            order: self.order,
            tag: self.tag.clone(),
            screen_coords: self.screen_coords,
            highlighted: self.highlighted,
            expand_bbox: self.expand_bbox,
            settings: self.settings.clone(),
            revision: 0,
        }
    }

    /// Deep copy with no manager, no parent links and detached vertices
    pub fn detached_copy(&self) -> Self {
        self.copy_with(self.primitives.iter().map(Primitive::detached_copy).collect())
    }

    /// New detached figure with every primitive reflected about `plane`.
    ///
    /// All or nothing: `None` if any primitive fails to mirror.
    pub fn mirrored(&self, plane: &Plane) -> Option<Self> {
        let primitives: Option<Vec<P>> = self.primitives.iter().map(|p| p.mirrored(plane)).collect();
        Some(self.copy_with(primitives?))
    }
}

impl Figure<Triangle> {
    pub fn normal_strategy(&self) -> NormalStrategy {
        self.settings.normal_strategy
    }

    /// Change the normal strategy of an unregistered figure and reapply it to every
    /// triangle. Registered figures go through
    /// [`VertexManager::set_normal_strategy`](crate::manager::VertexManager::set_normal_strategy).
    pub fn set_normal_strategy(&mut self, strategy: NormalStrategy) -> Result<()> {
        self.settings.normal_strategy = strategy;
        for tri in &mut self.primitives {
            tri.prepare(&self.settings)?;
        }
        self.touch();
        Ok(())
    }

    pub(crate) fn settings_mut(&mut self) -> &mut TriangleSettings {
        &mut self.settings
    }
}

impl<P: Primitive> fmt::Debug for Figure<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Figure")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &P::KIND)
            .field("primitives", &self.primitives.len())
            .field("visible", &self.visible)
            .field("order", &self.order)
            .field("screen_coords", &self.screen_coords)
            .field("highlighted", &self.highlighted)
            .field("expand_bbox", &self.expand_bbox)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// A figure of any primitive kind
#[derive(Debug)]
pub enum AnyFigure {
    Points(Figure<Point>),
    Lines(Figure<Line>),
    Triangles(Figure<Triangle>),
}

macro_rules! dispatch {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            AnyFigure::Points($f) => $body,
            AnyFigure::Lines($f) => $body,
            AnyFigure::Triangles($f) => $body,
        }
    };
}

impl AnyFigure {
    pub fn kind(&self) -> PrimitiveKind {
        match self {
            AnyFigure::Points(_) => PrimitiveKind::Point,
            AnyFigure::Lines(_) => PrimitiveKind::Line,
            AnyFigure::Triangles(_) => PrimitiveKind::Triangle,
        }
    }

    pub fn id(&self) -> Option<FigureId> {
        dispatch!(self, f => f.id())
    }

    pub(crate) fn set_id(&mut self, id: Option<FigureId>) {
        dispatch!(self, f => f.set_id(id))
    }

    pub fn name(&self) -> &str {
        dispatch!(self, f => f.name())
    }

    pub fn len(&self) -> usize {
        dispatch!(self, f => f.len())
    }

    pub fn is_empty(&self) -> bool {
        dispatch!(self, f => f.is_empty())
    }

    pub fn object_matrix(&self) -> &Matrix4<f32> {
        dispatch!(self, f => f.object_matrix())
    }

    pub fn visible(&self) -> bool {
        dispatch!(self, f => f.visible())
    }

    pub fn order(&self) -> i32 {
        dispatch!(self, f => f.order())
    }

    pub fn tag(&self) -> Option<&Tag> {
        dispatch!(self, f => f.tag())
    }

    pub fn screen_coords(&self) -> bool {
        dispatch!(self, f => f.screen_coords())
    }

    pub fn highlighted(&self) -> bool {
        dispatch!(self, f => f.highlighted())
    }

    pub fn expand_bbox(&self) -> bool {
        dispatch!(self, f => f.expand_bbox())
    }

    pub fn revision(&self) -> u64 {
        dispatch!(self, f => f.revision())
    }

    pub fn changed_since(&self, revision: u64) -> bool {
        dispatch!(self, f => f.changed_since(revision))
    }

    pub fn bbox_policy(&self) -> BBoxPolicy {
        dispatch!(self, f => f.bbox_policy())
    }

    pub fn bbox(&self) -> BBox {
        dispatch!(self, f => f.bbox())
    }

    pub fn local_bbox(&self) -> BBox {
        dispatch!(self, f => f.local_bbox())
    }

    pub fn indexes(&self) -> Vec<u32> {
        dispatch!(self, f => f.indexes())
    }

    pub fn detached_copy(&self) -> AnyFigure {
        match self {
            AnyFigure::Points(f) => AnyFigure::Points(f.detached_copy()),
            AnyFigure::Lines(f) => AnyFigure::Lines(f.detached_copy()),
            AnyFigure::Triangles(f) => AnyFigure::Triangles(f.detached_copy()),
        }
    }

    pub fn mirrored(&self, plane: &Plane) -> Option<AnyFigure> {
        Some(match self {
            AnyFigure::Points(f) => AnyFigure::Points(f.mirrored(plane)?),
            AnyFigure::Lines(f) => AnyFigure::Lines(f.mirrored(plane)?),
            AnyFigure::Triangles(f) => AnyFigure::Triangles(f.mirrored(plane)?),
        })
    }

    pub fn as_points(&self) -> Option<&Figure<Point>> {
        match self {
            AnyFigure::Points(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_lines(&self) -> Option<&Figure<Line>> {
        match self {
            AnyFigure::Lines(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_triangles(&self) -> Option<&Figure<Triangle>> {
        match self {
            AnyFigure::Triangles(f) => Some(f),
            _ => None,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        dispatch!(self, f => f.set_name(name))
    }

    pub fn set_object_matrix(&mut self, matrix: Matrix4<f32>) {
        dispatch!(self, f => f.set_object_matrix(matrix))
    }

    pub fn set_visible(&mut self, visible: bool) {
        dispatch!(self, f => f.set_visible(visible))
    }

    pub fn set_order(&mut self, order: i32) {
        dispatch!(self, f => f.set_order(order))
    }

    pub fn set_tag(&mut self, tag: Option<Tag>) {
        dispatch!(self, f => f.set_tag(tag))
    }

    pub fn set_screen_coords(&mut self, screen_coords: bool) {
        dispatch!(self, f => f.set_screen_coords(screen_coords))
    }

    pub fn set_highlighted(&mut self, highlighted: bool) {
        dispatch!(self, f => f.set_highlighted(highlighted))
    }

    pub fn set_expand_bbox(&mut self, expand_bbox: bool) {
        dispatch!(self, f => f.set_expand_bbox(expand_bbox))
    }

    /// Whether any vertex of any primitive is attached to a manager
    pub fn is_attached(&self) -> bool {
        dispatch!(self, f => f.primitives().iter().any(Primitive::is_attached))
    }

    pub(crate) fn touch(&mut self) {
        dispatch!(self, f => f.touch())
    }

    pub(crate) fn try_for_each_slot_mut<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut VertexSlot) -> Result<()>,
    {
        dispatch!(self, f => {
            for p in f.primitives_mut() {
                for slot in p.slots_mut() {
                    visit(slot)?;
                }
            }
            Ok(())
        })
    }

    pub(crate) fn slot_mut(&mut self, primitive: usize, corner: usize) -> Option<&mut VertexSlot> {
        dispatch!(self, f => f
            .primitives_mut()
            .get_mut(primitive)
            .and_then(|p| p.slots_mut().get_mut(corner)))
    }
}

impl From<Figure<Point>> for AnyFigure {
    fn from(figure: Figure<Point>) -> Self {
        AnyFigure::Points(figure)
    }
}

impl From<Figure<Line>> for AnyFigure {
    fn from(figure: Figure<Line>) -> Self {
        AnyFigure::Lines(figure)
    }
}

impl From<Figure<Triangle>> for AnyFigure {
    fn from(figure: Figure<Triangle>) -> Self {
        AnyFigure::Triangles(figure)
    }
}
