//! The vertex interning store and figure registry

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytemuck::Zeroable;
use log::{debug, trace};
use nalgebra::{Matrix4, Unit};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bbox::BBox;
use crate::error::{Error, Result};
use crate::figure::{AnyFigure, Figure, FigureId, Tag};
use crate::geometry::Ray;
use crate::point::*;
use crate::primitive::*;
use crate::vertex::{AttachedVertex, Color, Vertex, VertexIndex, VertexRecord, VertexSlot};

/// Default rounding step for vertex signatures
pub const DEFAULT_TOLERANCE: f32 = 1e-6;

/// Default position tolerance for mean normals, relative to the aggregate bbox diagonal
pub const DEFAULT_MEAN_NORMAL_RELATIVE_TOLERANCE: f32 = 1e-4;

/// Configuration of a [`VertexManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Rounding step used when computing vertex signatures
    pub tolerance: f32,
    /// Coincidence tolerance for mean normals, as a fraction of the bbox diagonal
    pub mean_normal_relative_tolerance: f32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            mean_normal_relative_tolerance: DEFAULT_MEAN_NORMAL_RELATIVE_TOLERANCE,
        }
    }
}

/// How an interned vertex affects the aggregate bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BBoxPolicy {
    /// Screen-coordinate figures and figures opted out of bbox expansion
    Ignore,
    /// The raw vertex position is inserted
    Raw,
    /// The position is transformed by the figure's object matrix first
    Transformed(Matrix4<f32>),
}

/// One figure's worth of drawing work
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub figure: FigureId,
    pub kind: PrimitiveKind,
    pub indexes: Vec<u32>,
    pub object_matrix: Matrix4<f32>,
    pub screen_coords: bool,
    pub highlighted: bool,
}

/// Result of a ray hit test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub figure: FigureId,
    pub primitive: usize,
    /// Hit point in local space
    pub point: Point3f,
    /// Ray parameter of the hit
    pub distance: f32,
}

/// Source of store ids, so handles can be traced back to the store that issued them
static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
struct VertexStore {
    id: u64,
    records: Vec<VertexRecord>,
    ref_counts: Vec<u32>,
    signatures: HashMap<String, VertexIndex>,
    free: BTreeSet<u32>,
    bbox: BBox,
    vbo: Option<Arc<[VertexRecord]>>,
}

impl VertexStore {
    fn new() -> Self {
        Self {
            id: NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed),
            records: Vec::new(),
            ref_counts: Vec::new(),
            signatures: HashMap::new(),
            free: BTreeSet::new(),
            bbox: BBox::new(),
            vbo: None,
        }
    }

    fn intern(&mut self, vertex: Vertex, tolerance: f32, policy: BBoxPolicy) -> AttachedVertex {
        let signature = vertex.signature(tolerance);
        let index = match self.signatures.get(&signature) {
            Some(&index) => {
                self.ref_counts[index.as_usize()] += 1;
                index
            }
            None => {
                let record = vertex.to_record();
                let index = match self.free.pop_first() {
                    Some(slot) => {
                        self.records[slot as usize] = record;
                        self.ref_counts[slot as usize] = 1;
                        VertexIndex(slot)
                    }
                    None => {
                        self.records.push(record);
                        self.ref_counts.push(1);
                        VertexIndex((self.records.len() - 1) as u32)
                    }
                };
                self.signatures.insert(signature.clone(), index);
                index
            }
        };
        trace!("interned vertex {index} (refs {})", self.ref_counts[index.as_usize()]);

        match policy {
            BBoxPolicy::Ignore => {}
            BBoxPolicy::Raw => self.bbox.insert_point(&vertex.position),
            BBoxPolicy::Transformed(m) => self.bbox.insert_point(&m.transform_point(&vertex.position)),
        }
        self.vbo = None;
        AttachedVertex::new(vertex, index, signature, self.id)
    }

    fn is_live(&self, attached: &AttachedVertex) -> bool {
        let index = attached.index();
        attached.owner() == self.id
            && self.signatures.get(attached.signature()) == Some(&index)
            && self.ref_counts.get(index.as_usize()).is_some_and(|&c| c > 0)
    }

    fn release(&mut self, attached: AttachedVertex) -> Result<Vertex> {
        if !self.is_live(&attached) {
            return Err(Error::VertexNotAttached);
        }
        let (vertex, index, signature) = attached.into_parts();
        let slot = index.as_usize();
        self.ref_counts[slot] -= 1;
        if self.ref_counts[slot] == 0 {
            self.signatures.remove(&signature);
            self.records[slot] = VertexRecord::zeroed();
            self.free.insert(index.0);
            trace!("freed vertex slot {index}");
        }
        self.vbo = None;
        Ok(vertex)
    }

    fn attach_slot(&mut self, slot: &mut VertexSlot, tolerance: f32, policy: BBoxPolicy) -> Result<()> {
        match slot.take() {
            VertexSlot::Detached(vertex) => {
                *slot = VertexSlot::Attached(self.intern(vertex, tolerance, policy));
                Ok(())
            }
            attached => {
                *slot = attached;
                Err(Error::VertexAlreadyAttached)
            }
        }
    }

    fn snapshot(&mut self) -> Arc<[VertexRecord]> {
        if let Some(vbo) = &self.vbo {
            return Arc::clone(vbo);
        }
        let vbo: Arc<[VertexRecord]> = Arc::from(self.records.as_slice());
        self.vbo = Some(Arc::clone(&vbo));
        vbo
    }

    fn detach_slot(&mut self, slot: &mut VertexSlot) -> Result<()> {
        match slot.take() {
            VertexSlot::Attached(attached) if self.is_live(&attached) => {
                *slot = VertexSlot::Detached(self.release(attached)?);
                Ok(())
            }
            other => {
                *slot = other;
                Err(Error::VertexNotAttached)
            }
        }
    }
}

/// Deduplicating vertex store that owns the registered figures.
///
/// Content-identical vertices (same [`Vertex::signature`]) share one canonical slot in
/// the upload array, reference counted by the number of attached vertices mapping to
/// it. Freed slots are reused, so indices of live slots never move.
///
/// Interning, release and snapshotting lock an internal mutex. Figure-level changes take
/// `&mut self` and belong to the owning thread; render threads read the vertex array
/// through a [`VboReader`] obtained from [`VertexManager::reader`], which stays usable
/// while the owner keeps editing.
#[derive(Debug)]
pub struct VertexManager {
    config: ManagerConfig,
    store: Arc<Mutex<VertexStore>>,
    figures: BTreeMap<FigureId, AnyFigure>,
    next_figure_id: u64,
    generation: Arc<AtomicU64>,
}

/// Read-only handle on a manager's vertex array, for render threads.
///
/// Each snapshot is taken under the store lock, so it never shows a half-applied
/// intern or release.
#[derive(Debug, Clone)]
pub struct VboReader {
    store: Arc<Mutex<VertexStore>>,
    generation: Arc<AtomicU64>,
}

impl VboReader {
    /// Same snapshot as [`VertexManager::vbo_array`]
    pub fn vbo_array(&self) -> Arc<[VertexRecord]> {
        self.store.lock().snapshot()
    }

    pub fn vertex_count(&self) -> usize {
        self.store.lock().signatures.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn changed_since(&self, generation: u64) -> bool {
        self.generation() != generation
    }
}

impl VertexManager {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        Self {
            config,
            store: Arc::new(Mutex::new(VertexStore::new())),
            figures: BTreeMap::new(),
            next_figure_id: 0,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Handle for reading the vertex array from other threads
    pub fn reader(&self) -> VboReader {
        VboReader {
            store: Arc::clone(&self.store),
            generation: Arc::clone(&self.generation),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Counter bumped by every change to the store or the figures
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Whether anything changed since `generation` was read
    pub fn changed_since(&self, generation: u64) -> bool {
        self.generation() != generation
    }

    /// Intern a vertex and return its attached handle
    pub fn add_vertex(&self, vertex: Vertex, policy: BBoxPolicy) -> AttachedVertex {
        let attached = self.store.lock().intern(vertex, self.config.tolerance, policy);
        self.invalidate();
        attached
    }

    /// Release an attached vertex and return its detached content.
    ///
    /// Fails with [`Error::VertexNotAttached`] if the handle does not name a live slot of
    /// this manager. The aggregate bounding box is not shrunk here; figure removal
    /// recomputes it.
    pub fn remove_vertex(&self, attached: AttachedVertex) -> Result<Vertex> {
        let vertex = self.store.lock().release(attached)?;
        self.invalidate();
        Ok(vertex)
    }

    /// Attach a detached slot in place
    pub(crate) fn attach_slot(&self, slot: &mut VertexSlot, policy: BBoxPolicy) -> Result<()> {
        self.store.lock().attach_slot(slot, self.config.tolerance, policy)?;
        self.invalidate();
        Ok(())
    }

    /// Detach an attached slot in place
    pub(crate) fn detach_slot(&self, slot: &mut VertexSlot) -> Result<()> {
        self.store.lock().detach_slot(slot)?;
        self.invalidate();
        Ok(())
    }

    /// Dense snapshot of all canonical slots for GPU upload.
    ///
    /// The snapshot is cached until the next add or remove. Freed slots appear as
    /// zeroed records so that live indices stay stable.
    pub fn vbo_array(&self) -> Arc<[VertexRecord]> {
        self.store.lock().snapshot()
    }

    /// Number of live canonical slots
    pub fn vertex_count(&self) -> usize {
        self.store.lock().signatures.len()
    }

    /// Length of the upload array, including freed slots
    pub fn slot_count(&self) -> usize {
        self.store.lock().records.len()
    }

    /// How many attached vertices share the slot at `index`
    pub fn ref_count(&self, index: VertexIndex) -> u32 {
        self.store
            .lock()
            .ref_counts
            .get(index.as_usize())
            .copied()
            .unwrap_or(0)
    }

    /// Index of the live slot holding content equal to `vertex`, if any
    pub fn find_vertex(&self, vertex: &Vertex) -> Option<VertexIndex> {
        let signature = vertex.signature(self.config.tolerance);
        self.store.lock().signatures.get(&signature).copied()
    }

    /// Aggregate bounding box in local space, excluding screen-coordinate figures and
    /// figures opted out of bbox expansion
    pub fn bbox(&self) -> BBox {
        self.store.lock().bbox.clone()
    }

    /// Recompute the aggregate bounding box from the registered figures
    pub fn recompute_bbox(&self) {
        let mut bbox = BBox::new();
        for figure in self.figures.values() {
            match figure.bbox_policy() {
                BBoxPolicy::Ignore => {}
                BBoxPolicy::Raw => bbox.union(&figure.bbox()),
                BBoxPolicy::Transformed(_) => bbox.union(&figure.local_bbox()),
            }
        }
        self.store.lock().bbox = bbox;
    }

    /// Register a figure, attaching every vertex of every primitive.
    ///
    /// Fails with [`Error::VertexAlreadyAttached`] if any vertex is already attached.
    pub fn add_figure(&mut self, figure: impl Into<AnyFigure>) -> Result<FigureId> {
        let mut figure = figure.into();
        if figure.id().is_some() || figure.is_attached() {
            return Err(Error::VertexAlreadyAttached);
        }

        let id = FigureId(self.next_figure_id);
        self.next_figure_id += 1;
        figure.set_id(Some(id));

        let policy = figure.bbox_policy();
        let tolerance = self.config.tolerance;
        {
            let mut store = self.store.lock();
            figure.try_for_each_slot_mut(|slot| store.attach_slot(slot, tolerance, policy))?;
            if let AnyFigure::Triangles(triangles) = &mut figure {
                if matches!(triangles.normal_strategy(), NormalStrategy::Mean) {
                    rebuild_mean_normals(&mut store, &self.config, triangles)?;
                }
            }
        }

        debug!(
            "registered {id} '{}' ({} {}s)",
            figure.name(),
            figure.len(),
            figure.kind()
        );
        self.figures.insert(id, figure);
        self.invalidate();
        Ok(id)
    }

    /// Unregister a figure and hand it back with all vertices detached
    pub fn remove_figure(&mut self, id: FigureId) -> Result<AnyFigure> {
        let mut figure = self.figures.remove(&id).ok_or(Error::FigureNotFound(id))?;
        {
            let mut store = self.store.lock();
            figure.try_for_each_slot_mut(|slot| store.detach_slot(slot))?;
        }
        figure.set_id(None);
        self.recompute_bbox();
        self.invalidate();
        debug!("removed {id} '{}'", figure.name());
        Ok(figure)
    }

    pub fn figure(&self, id: FigureId) -> Option<&AnyFigure> {
        self.figures.get(&id)
    }

    /// Typed access to a registered figure
    pub fn typed_figure<P: Primitive>(&self, id: FigureId) -> Option<&Figure<P>> {
        self.figures.get(&id).and_then(P::figure_of)
    }

    /// The registered figure a primitive belongs to
    pub fn parent_figure<P: Primitive>(&self, primitive: &P) -> Result<&AnyFigure> {
        let id = primitive.parent().ok_or(Error::MissingParentFigure)?;
        self.figures.get(&id).ok_or(Error::FigureNotFound(id))
    }

    /// Registered figures in registration order
    pub fn figures(&self) -> impl Iterator<Item = &AnyFigure> {
        self.figures.values()
    }

    pub fn figure_ids(&self) -> Vec<FigureId> {
        self.figures.keys().copied().collect()
    }

    pub fn figure_count(&self) -> usize {
        self.figures.len()
    }

    fn entry(&mut self, id: FigureId) -> Result<&mut AnyFigure> {
        self.figures.get_mut(&id).ok_or(Error::FigureNotFound(id))
    }

    /// Add a detached primitive to a registered figure, attaching its vertices.
    ///
    /// Returns the primitive's index within the figure.
    pub fn add_primitive<P: Primitive>(&mut self, id: FigureId, mut primitive: P) -> Result<usize> {
        if primitive.is_attached() {
            return Err(Error::VertexAlreadyAttached);
        }
        let tolerance = self.config.tolerance;
        let any = self.figures.get_mut(&id).ok_or(Error::FigureNotFound(id))?;
        let kind = any.kind();
        let policy = any.bbox_policy();
        let figure = P::figure_of_mut(any).ok_or(Error::PrimitiveKindMismatch(id, kind))?;

        primitive.prepare(figure.settings())?;
        primitive.set_parent(Some(id));
        {
            let mut store = self.store.lock();
            for slot in primitive.slots_mut() {
                store.attach_slot(slot, tolerance, policy)?;
            }
        }
        figure.primitives_mut().push(primitive);
        figure.touch();
        let index = figure.len() - 1;

        self.rebuild_if_mean(id)?;
        self.invalidate();
        Ok(index)
    }

    /// Remove a primitive from a registered figure and return it detached
    pub fn remove_primitive<P: Primitive>(&mut self, id: FigureId, index: usize) -> Result<P> {
        let any = self.figures.get_mut(&id).ok_or(Error::FigureNotFound(id))?;
        let kind = any.kind();
        let figure = P::figure_of_mut(any).ok_or(Error::PrimitiveKindMismatch(id, kind))?;
        if index >= figure.len() {
            return Err(Error::PrimitiveNotFound { figure: id, index });
        }

        let mut primitive = figure.primitives_mut().remove(index);
        figure.touch();
        {
            let mut store = self.store.lock();
            for slot in primitive.slots_mut() {
                store.detach_slot(slot)?;
            }
        }
        primitive.set_parent(None);

        self.rebuild_if_mean(id)?;
        self.recompute_bbox();
        self.invalidate();
        Ok(primitive)
    }

    /// Change one vertex of a registered primitive.
    ///
    /// Identity in the store is by content, so the vertex is released, edited and
    /// interned again under its new signature.
    pub fn update_vertex<F>(&mut self, id: FigureId, primitive: usize, corner: usize, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Vertex),
    {
        let tolerance = self.config.tolerance;
        let any = self.figures.get_mut(&id).ok_or(Error::FigureNotFound(id))?;
        let policy = any.bbox_policy();
        let slot = any
            .slot_mut(primitive, corner)
            .ok_or(Error::PrimitiveNotFound { figure: id, index: primitive })?;
        {
            let mut store = self.store.lock();
            store.detach_slot(slot)?;
            edit(slot.vertex_mut()?);
            store.attach_slot(slot, tolerance, policy)?;
        }
        any.touch();

        self.rebuild_if_mean(id)?;
        self.recompute_bbox();
        self.invalidate();
        Ok(())
    }

    /// Recolor every vertex of a registered figure
    pub fn set_color(&mut self, id: FigureId, color: Color) -> Result<()> {
        let tolerance = self.config.tolerance;
        let any = self.figures.get_mut(&id).ok_or(Error::FigureNotFound(id))?;
        let policy = any.bbox_policy();
        {
            let mut store = self.store.lock();
            any.try_for_each_slot_mut(|slot| {
                store.detach_slot(slot)?;
                slot.vertex_mut()?.color = color;
                store.attach_slot(slot, tolerance, policy)
            })?;
        }
        any.touch();
        self.invalidate();
        Ok(())
    }

    /// Change the normal strategy of a registered triangle figure and reapply it
    pub fn set_normal_strategy(&mut self, id: FigureId, strategy: NormalStrategy) -> Result<()> {
        let tolerance = self.config.tolerance;
        let any = self.figures.get_mut(&id).ok_or(Error::FigureNotFound(id))?;
        let kind = any.kind();
        let policy = any.bbox_policy();
        let figure =
            Triangle::figure_of_mut(any).ok_or(Error::PrimitiveKindMismatch(id, kind))?;
        {
            let mut store = self.store.lock();
            figure.settings_mut().normal_strategy = strategy;
            let settings = figure.settings().clone();
            for tri in figure.primitives_mut() {
                for slot in tri.slots_mut() {
                    store.detach_slot(slot)?;
                }
                tri.prepare(&settings)?;
                for slot in tri.slots_mut() {
                    store.attach_slot(slot, tolerance, policy)?;
                }
            }
            if matches!(strategy, NormalStrategy::Mean) {
                rebuild_mean_normals(&mut store, &self.config, figure)?;
            }
        }
        figure.touch();
        self.invalidate();
        Ok(())
    }

    fn rebuild_if_mean(&mut self, id: FigureId) -> Result<()> {
        if let Some(AnyFigure::Triangles(figure)) = self.figures.get_mut(&id) {
            if matches!(figure.normal_strategy(), NormalStrategy::Mean) {
                let mut store = self.store.lock();
                rebuild_mean_normals(&mut store, &self.config, figure)?;
            }
        }
        Ok(())
    }

    pub fn set_name(&mut self, id: FigureId, name: impl Into<String>) -> Result<()> {
        self.entry(id)?.set_name(name);
        self.invalidate();
        Ok(())
    }

    pub fn set_object_matrix(&mut self, id: FigureId, matrix: Matrix4<f32>) -> Result<()> {
        self.entry(id)?.set_object_matrix(matrix);
        self.recompute_bbox();
        self.invalidate();
        Ok(())
    }

    pub fn set_visible(&mut self, id: FigureId, visible: bool) -> Result<()> {
        self.entry(id)?.set_visible(visible);
        self.invalidate();
        Ok(())
    }

    pub fn set_order(&mut self, id: FigureId, order: i32) -> Result<()> {
        self.entry(id)?.set_order(order);
        self.invalidate();
        Ok(())
    }

    pub fn set_tag(&mut self, id: FigureId, tag: Option<Tag>) -> Result<()> {
        self.entry(id)?.set_tag(tag);
        self.invalidate();
        Ok(())
    }

    pub fn set_highlighted(&mut self, id: FigureId, highlighted: bool) -> Result<()> {
        self.entry(id)?.set_highlighted(highlighted);
        self.invalidate();
        Ok(())
    }

    pub fn set_screen_coords(&mut self, id: FigureId, screen_coords: bool) -> Result<()> {
        self.entry(id)?.set_screen_coords(screen_coords);
        self.recompute_bbox();
        self.invalidate();
        Ok(())
    }

    pub fn set_expand_bbox(&mut self, id: FigureId, expand_bbox: bool) -> Result<()> {
        self.entry(id)?.set_expand_bbox(expand_bbox);
        self.recompute_bbox();
        self.invalidate();
        Ok(())
    }

    /// Visible figures with their index lists, highest order first. Figures of equal
    /// order keep their registration order.
    pub fn draw_list(&self) -> Vec<DrawBatch> {
        let mut figures: Vec<&AnyFigure> = self.figures.values().filter(|f| f.visible()).collect();
        figures.sort_by_key(|f| std::cmp::Reverse(f.order()));
        figures
            .into_iter()
            .filter_map(|f| {
                Some(DrawBatch {
                    figure: f.id()?,
                    kind: f.kind(),
                    indexes: f.indexes(),
                    object_matrix: *f.object_matrix(),
                    screen_coords: f.screen_coords(),
                    highlighted: f.highlighted(),
                })
            })
            .collect()
    }

    /// Nearest triangle hit by a local-space ray among visible model-space figures
    pub fn hit_test(&self, ray: &Ray) -> Option<Hit> {
        let mut best: Option<Hit> = None;
        for figure in self.figures.values() {
            let AnyFigure::Triangles(triangles) = figure else {
                continue;
            };
            if !triangles.visible() || triangles.screen_coords() {
                continue;
            }
            let (Some(id), Some(inverse)) = (triangles.id(), triangles.object_matrix().try_inverse())
            else {
                continue;
            };
            // Affine maps preserve the ray parameter, so hits compare across figures.
            let object_ray = ray.transformed(&inverse);
            for (index, tri) in triangles.primitives().iter().enumerate() {
                let Some(t) = tri.intersect_ray(&object_ray) else {
                    continue;
                };
                if best.map_or(true, |b| t < b.distance) {
                    best = Some(Hit {
                        figure: id,
                        primitive: index,
                        point: ray.at(t),
                        distance: t,
                    });
                }
            }
        }
        best
    }
}

impl Default for VertexManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace the normals of a mean-normal triangle figure by the average face normal of
/// all coincident vertices. Vertices are released, edited and interned again.
fn rebuild_mean_normals(
    store: &mut VertexStore,
    config: &ManagerConfig,
    figure: &mut Figure<Triangle>,
) -> Result<()> {
    let policy = figure.bbox_policy();
    for tri in figure.primitives_mut() {
        for slot in tri.slots_mut() {
            if slot.is_attached() {
                store.detach_slot(slot)?;
            }
        }
    }

    let mut aggregate = store.bbox.clone();
    aggregate.union(&figure.local_bbox());
    let tolerance = (aggregate.diagonal() * config.mean_normal_relative_tolerance).max(config.tolerance);

    let face_normals: Vec<Option<Vector3f>> =
        figure.primitives().iter().map(Triangle::face_normal).collect();
    let mut sums: HashMap<String, Vector3f> = HashMap::new();
    for (tri, normal) in figure.primitives().iter().zip(&face_normals) {
        let Some(normal) = normal else { continue };
        for v in tri.vertices() {
            *sums
                .entry(v.position_signature(tolerance))
                .or_insert_with(Vector3f::zeros) += normal;
        }
    }

    for (tri, face_normal) in figure.primitives_mut().iter_mut().zip(face_normals) {
        for slot in tri.slots_mut() {
            let vertex = slot.vertex_mut()?;
            let mean = sums
                .get(&vertex.position_signature(tolerance))
                .and_then(|sum| Unit::try_new(*sum, f32::EPSILON))
                .map(Unit::into_inner);
            if let Some(normal) = mean.or(face_normal) {
                vertex.normal = normal;
            }
            store.attach_slot(slot, config.tolerance, policy)?;
        }
    }
    figure.touch();
    Ok(())
}
