//! Vertex records, signatures and attachment state

use std::fmt::{self, Write};

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Plane;
use crate::point::*;

/// RGBA color with components in `0..=1`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Lighting strengths of a vertex
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
}

impl Material {
    pub const fn new(ambient: f32, diffuse: f32, specular: f32) -> Self {
        Self {
            ambient,
            diffuse,
            specular,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.ambient, self.diffuse, self.specular]
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(0.2, 0.8, 0.3)
    }
}

/// GPU-uploadable vertex layout.
///
/// Field order and sizes are fixed: position (3×f32), normal (3×f32), color (4×f32),
/// material (3×f32), texcoord (2×f32); 60 bytes with no padding.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct VertexRecord {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
    pub material: [f32; 3],
    pub texcoord: [f32; 2],
}

/// A mutable vertex: the content that gets interned by a
/// [`VertexManager`](crate::manager::VertexManager)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3f,
    pub normal: Vector3f,
    pub color: Color,
    pub material: Material,
    pub texcoord: Vector2f,
}

impl Vertex {
    /// Create a vertex at `position` with default normal (+Z), color, material and texcoord
    pub fn new(position: Point3f) -> Self {
        Self {
            position,
            normal: Vector3f::z(),
            color: Color::default(),
            material: Material::default(),
            texcoord: Vector2f::zeros(),
        }
    }

    pub fn with_normal(mut self, normal: Vector3f) -> Self {
        self.normal = normal;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_texcoord(mut self, texcoord: Vector2f) -> Self {
        self.texcoord = texcoord;
        self
    }

    /// Content signature: every field quantized to `tolerance`.
    ///
    /// Two vertices whose fields all round to the same multiple of `tolerance` share a
    /// signature and are stored once by the manager.
    pub fn signature(&self, tolerance: f32) -> String {
        let mut sig = String::with_capacity(96);
        write_components(&mut sig, 'p', self.position.coords.as_slice(), tolerance);
        write_components(&mut sig, 'n', self.normal.as_slice(), tolerance);
        write_components(&mut sig, 'c', &self.color.to_array(), tolerance);
        write_components(&mut sig, 'm', &self.material.to_array(), tolerance);
        write_components(&mut sig, 't', self.texcoord.as_slice(), tolerance);
        sig
    }

    /// Signature of the position alone, used to group coincident vertices
    pub fn position_signature(&self, tolerance: f32) -> String {
        let mut sig = String::with_capacity(32);
        write_components(&mut sig, 'p', self.position.coords.as_slice(), tolerance);
        sig
    }

    /// Flatten into the upload layout
    pub fn to_record(&self) -> VertexRecord {
        VertexRecord {
            position: self.position.coords.into(),
            normal: self.normal.into(),
            color: self.color.to_array(),
            material: self.material.to_array(),
            texcoord: self.texcoord.into(),
        }
    }

    /// Reflect position and normal about `plane`.
    ///
    /// Returns `None` if the position cannot be projected onto the plane.
    pub fn mirrored(&self, plane: &Plane) -> Option<Vertex> {
        let position = plane.reflect_point(&self.position)?;
        Some(Vertex {
            position,
            normal: plane.reflect_vector(&self.normal),
            ..self.clone()
        })
    }
}

impl Default for Vertex {
    fn default() -> Self {
        Self::new(Point3f::origin())
    }
}

impl From<Point3f> for Vertex {
    fn from(position: Point3f) -> Self {
        Self::new(position)
    }
}

/// Largest step count that still converts to `i64` exactly
const MAX_STEPS: f64 = 9.0e15;

/// Write one quantized component. NaN gets its own token and values whose step count
/// leaves the integer range (infinities included) are written as raw bits, so neither
/// collides with a finite rounded value.
fn write_quantized(sig: &mut String, value: f32, tolerance: f32) -> fmt::Result {
    if value.is_nan() {
        return sig.write_str("nan");
    }
    let steps = (f64::from(value) / f64::from(tolerance)).round();
    if steps.abs() < MAX_STEPS {
        write!(sig, "{}", steps as i64)
    } else {
        write!(sig, "x{:08x}", value.to_bits())
    }
}

fn write_components(sig: &mut String, tag: char, values: &[f32], tolerance: f32) {
    sig.push(tag);
    for (i, v) in values.iter().enumerate() {
        sig.push(if i == 0 { ':' } else { ',' });
        // Writing into a String cannot fail.
        let _ = write_quantized(sig, *v, tolerance);
    }
    sig.push(';');
}

/// Index of a canonical slot in a manager's vertex array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexIndex(pub u32);

impl VertexIndex {
    pub fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VertexIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A vertex interned by a manager.
///
/// Only a [`VertexManager`](crate::manager::VertexManager) creates these, and the handle
/// is neither `Clone` nor `Copy`: once a vertex has been handed to the manager the
/// original value is gone, so it cannot be attached twice. Give the handle back to
/// [`VertexManager::remove_vertex`](crate::manager::VertexManager::remove_vertex) to get
/// the detached content again.
#[derive(Debug, PartialEq)]
pub struct AttachedVertex {
    vertex: Vertex,
    index: VertexIndex,
    signature: String,
    owner: u64,
}

impl AttachedVertex {
    pub(crate) fn new(vertex: Vertex, index: VertexIndex, signature: String, owner: u64) -> Self {
        Self {
            vertex,
            index,
            signature,
            owner,
        }
    }

    /// Id of the store that interned this vertex
    pub(crate) fn owner(&self) -> u64 {
        self.owner
    }

    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    pub fn index(&self) -> VertexIndex {
        self.index
    }

    /// The signature this vertex was interned under
    pub fn signature(&self) -> &str {
        &self.signature
    }

    pub(crate) fn into_parts(self) -> (Vertex, VertexIndex, String) {
        (self.vertex, self.index, self.signature)
    }
}

/// Storage for one corner of a primitive
#[derive(Debug, PartialEq)]
pub enum VertexSlot {
    Detached(Vertex),
    Attached(AttachedVertex),
}

impl VertexSlot {
    pub fn vertex(&self) -> &Vertex {
        match self {
            VertexSlot::Detached(v) => v,
            VertexSlot::Attached(a) => a.vertex(),
        }
    }

    /// Mutable access to the content; only allowed while detached
    pub fn vertex_mut(&mut self) -> Result<&mut Vertex> {
        match self {
            VertexSlot::Detached(v) => Ok(v),
            VertexSlot::Attached(_) => Err(Error::VertexAlreadyAttached),
        }
    }

    pub fn index(&self) -> Option<VertexIndex> {
        match self {
            VertexSlot::Detached(_) => None,
            VertexSlot::Attached(a) => Some(a.index()),
        }
    }

    pub fn is_attached(&self) -> bool {
        matches!(self, VertexSlot::Attached(_))
    }

    /// A detached slot holding a copy of this slot's content
    pub fn detached_copy(&self) -> VertexSlot {
        VertexSlot::Detached(self.vertex().clone())
    }

    /// Move the slot's state out, leaving a default detached vertex behind
    pub(crate) fn take(&mut self) -> VertexSlot {
        std::mem::replace(self, VertexSlot::Detached(Vertex::default()))
    }
}

impl From<Vertex> for VertexSlot {
    fn from(vertex: Vertex) -> Self {
        VertexSlot::Detached(vertex)
    }
}
