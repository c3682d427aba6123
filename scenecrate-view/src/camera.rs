//! Camera state for viewing a scene

use nalgebra::{Matrix4, Point3, Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use scenecrate_core::{format_matrix, parse_matrix, Error, Result};

use crate::pipeline::{orthographic_matrix, perspective_matrix, view_matrix, Viewport};

/// How eye space is projected onto the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionMode {
    #[default]
    Perspective,
    Orthographic,
}

/// A 3D camera for viewing figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub projection: ProjectionMode,
    /// Eye-space units per pixel in orthographic mode
    pub ortho_zoom: f32,
}

impl Camera {
    /// Create a perspective camera with a 45° field of view
    pub fn new(position: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Self {
        Self {
            position,
            target,
            up,
            fov_y: std::f32::consts::FRAC_PI_4,
            near: 0.1,
            far: 100.0,
            projection: ProjectionMode::Perspective,
            ortho_zoom: 0.01,
        }
    }

    /// Unit viewing direction; -Z if position and target coincide
    pub fn forward(&self) -> Vector3<f32> {
        (self.target - self.position)
            .try_normalize(f32::EPSILON)
            .unwrap_or(-Vector3::z())
    }

    /// Unit vector pointing to the right of the view
    pub fn right(&self) -> Vector3<f32> {
        let forward = self.forward();
        forward
            .cross(&self.up)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| {
                let fallback = if forward.y.abs() < 0.9 {
                    Vector3::y()
                } else {
                    Vector3::z()
                };
                forward.cross(&fallback).normalize()
            })
    }

    /// Unit up vector orthogonal to the view direction
    pub fn true_up(&self) -> Vector3<f32> {
        self.right().cross(&self.forward())
    }

    pub fn distance(&self) -> f32 {
        (self.target - self.position).norm()
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        view_matrix(self)
    }

    /// Get the projection matrix for the current mode
    pub fn projection_matrix(&self, viewport: &Viewport) -> Matrix4<f32> {
        match self.projection {
            ProjectionMode::Perspective => perspective_matrix(viewport, self.fov_y, self.near, self.far),
            ProjectionMode::Orthographic => {
                orthographic_matrix(viewport, self.ortho_zoom, self.near, self.far)
            }
        }
    }

    /// Move position and target along the view direction
    pub fn move_forward(&mut self, distance: f32) {
        let direction = self.forward();
        self.position += direction * distance;
        self.target += direction * distance;
    }

    /// Translate position and target together
    pub fn translate(&mut self, delta: &Vector3<f32>) {
        self.position += delta;
        self.target += delta;
    }

    /// Rotate the camera around the target: `yaw` about the up vector, then `pitch`
    /// about the right vector
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let Some(up) = Unit::try_new(self.true_up(), f32::EPSILON) else {
            return;
        };
        let yaw_rotation = UnitQuaternion::from_axis_angle(&up, yaw);
        let right = Unit::new_normalize(yaw_rotation * self.right());
        let rotation = UnitQuaternion::from_axis_angle(&right, pitch) * yaw_rotation;

        let offset = self.position - self.target;
        self.position = self.target + rotation * offset;
        self.up = rotation * self.up;
    }

    /// The view matrix as 16 row-major values
    pub fn view_string(&self) -> String {
        format_matrix(&self.view_matrix())
    }

    /// Restore position, direction and up from a [`Camera::view_string`]. The target is
    /// placed `focus_distance` ahead of the restored position.
    pub fn restore_view(&mut self, view: &str, focus_distance: f32) -> Result<()> {
        if !(focus_distance.is_finite() && focus_distance > 0.0) {
            return Err(Error::InvalidData(format!(
                "focus distance must be positive, got {focus_distance}"
            )));
        }
        let matrix = parse_matrix(view)?;
        let camera_to_world = matrix
            .try_inverse()
            .ok_or_else(|| Error::InvalidMatrix("view matrix is not invertible".to_string()))?;

        let position = camera_to_world.transform_point(&Point3::origin());
        let forward = camera_to_world
            .transform_vector(&-Vector3::z())
            .try_normalize(f32::EPSILON)
            .ok_or_else(|| Error::InvalidMatrix("view matrix has no direction".to_string()))?;
        self.position = position;
        self.target = position + forward * focus_distance;
        self.up = camera_to_world.transform_vector(&Vector3::y());
        Ok(())
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, 5.0),
            Point3::new(0.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
        )
    }
}
