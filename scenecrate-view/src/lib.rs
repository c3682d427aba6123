//! Viewing support for scenecrate scenes
//!
//! This crate maps figures to the screen and back:
//! - The object → local → world → eye → clip → NDC → screen transform chain
//! - Perspective and orthographic cameras
//! - Pan, zoom, rotation, tilt and zoom-to-fit
//! - Near/far plane selection against z-fighting
//! - Ray casting from a pixel for hit testing

pub mod camera;
pub mod control;
pub mod pipeline;

pub use camera::*;
pub use control::*;
pub use pipeline::*;
