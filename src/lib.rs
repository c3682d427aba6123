//! # scenecrate
//!
//! A retained-mode 3D scene geometry kernel for Rust.
//!
//! This is the umbrella crate that provides convenient access to all scenecrate
//! functionality. You can use this crate to get everything in one place, or use the
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Deduplicated vertex storage, primitives, figures, bounding boxes and
//!   plane/ray/triangle geometry
//! - **View**: Transform pipeline, camera operations, zoom-to-fit and hit testing
//!
//! ## Quick Start
//!
//! ```rust
//! use scenecrate::prelude::*;
//!
//! let mut quad = TriangleFigure::new("quad");
//! quad.push(Triangle::new(
//!     Point3f::new(0.0, 0.0, 0.0),
//!     Point3f::new(1.0, 0.0, 0.0),
//!     Point3f::new(1.0, 1.0, 0.0),
//! ))?;
//! quad.push(Triangle::new(
//!     Point3f::new(0.0, 0.0, 0.0),
//!     Point3f::new(1.0, 1.0, 0.0),
//!     Point3f::new(0.0, 1.0, 0.0),
//! ))?;
//!
//! let mut manager = VertexManager::new();
//! let id = manager.add_figure(quad)?;
//! // the two corners on the diagonal are stored once
//! assert_eq!(manager.vertex_count(), 4);
//!
//! let mut view = ViewControl::new(800, 600, ViewConfig::default());
//! view.zoom_fit(&manager.bbox().corners())?;
//! view.update_near_far(&manager.bbox())?;
//!
//! let pixel = view
//!     .pipeline(&Matrix4::identity())?
//!     .local_to_screen(&Point3f::new(0.75, 0.25, 0.0));
//! let hit = view.pick(&manager, &pixel.xy())?;
//! assert_eq!(hit.map(|h| h.figure), Some(id));
//! # Ok::<(), scenecrate::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables view
//! - `view`: Camera and transform pipeline

// Re-export core functionality
pub use scenecrate_core::*;

// Re-export sub-crates
#[cfg(feature = "view")]
pub use scenecrate_view as view;

/// Convenient imports for common use cases
pub mod prelude {
    pub use scenecrate_core::*;

    #[cfg(feature = "view")]
    pub use scenecrate_view::*;
}
