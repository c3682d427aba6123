//! Core data structures for scenecrate
//!
//! This crate provides the retained geometry model of a 3D viewer: deduplicated vertex
//! storage ready for GPU upload, primitives grouped into figures, bounding boxes and the
//! plane/ray/triangle geometry used for mirroring and hit testing.

pub mod bbox;
pub mod error;
pub mod figure;
pub mod geometry;
pub mod manager;
pub mod point;
pub mod primitive;
pub mod transform;
pub mod vertex;

pub use bbox::*;
pub use error::*;
pub use figure::*;
pub use geometry::*;
pub use manager::*;
pub use point::*;
pub use primitive::*;
pub use transform::*;
pub use vertex::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Matrix3, Matrix4, Point3, Unit, UnitQuaternion, Vector3, Vector4};
