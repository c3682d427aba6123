//! The object → local → world → eye → clip → NDC → screen transform chain

use nalgebra::{Isometry3, Matrix4, Orthographic3, Perspective3, Point2, UnitQuaternion, Vector4};
use serde::{Deserialize, Serialize};

use scenecrate_core::{Error, Point3f, Ray, Result, Vector3f};

use crate::camera::{Camera, ProjectionMode};

/// A 2D pixel position
pub type Point2f = Point2<f32>;

/// Direction of the screen Y axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum YAxis {
    /// Row 0 is the top of the screen
    #[default]
    Down,
    /// Row 0 is the bottom of the screen
    Up,
}

/// Pixel size of the render target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub y_axis: YAxis,
}

impl Viewport {
    /// Sizes below two pixels are raised to two so that `size - 1` never vanishes
    pub fn new(width: u32, height: u32, y_axis: YAxis) -> Self {
        Self {
            width: width.max(2),
            height: height.max(2),
            y_axis,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Largest pixel coordinate along X
    pub fn max_x(&self) -> f32 {
        (self.width.max(2) - 1) as f32
    }

    /// Largest pixel coordinate along Y
    pub fn max_y(&self) -> f32 {
        (self.height.max(2) - 1) as f32
    }

    pub fn center(&self) -> Point2f {
        Point2f::new(self.max_x() * 0.5, self.max_y() * 0.5)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800, 600, YAxis::Down)
    }
}

/// Scale, then rotate, then translate
pub fn model_matrix(scale: f32, rotation: UnitQuaternion<f32>, translation: Vector3f) -> Matrix4<f32> {
    Isometry3::from_parts(translation.into(), rotation).to_homogeneous() * Matrix4::new_scaling(scale)
}

/// Right-handed look-at matrix of `camera`.
///
/// A zero view direction falls back to looking down -Z, and an `up` parallel to the
/// view direction is replaced by the closest world axis that is not.
pub fn view_matrix(camera: &Camera) -> Matrix4<f32> {
    let forward = camera.forward();
    let mut up = camera.up;
    if up.cross(&forward).norm() < 1e-6 * up.norm().max(1.0) {
        up = if forward.y.abs() < 0.9 {
            Vector3f::y()
        } else {
            Vector3f::z()
        };
    }
    Matrix4::look_at_rh(&camera.position, &(camera.position + forward), &up)
}

pub fn perspective_matrix(viewport: &Viewport, fov_y: f32, near: f32, far: f32) -> Matrix4<f32> {
    Perspective3::new(viewport.aspect(), fov_y, near, far).to_homogeneous()
}

/// Orthographic projection where one pixel spans `ortho_zoom` eye units
pub fn orthographic_matrix(viewport: &Viewport, ortho_zoom: f32, near: f32, far: f32) -> Matrix4<f32> {
    let half_w = ortho_zoom * viewport.max_x() * 0.5;
    let half_h = ortho_zoom * viewport.max_y() * 0.5;
    Orthographic3::new(-half_w, half_w, -half_h, half_h, near, far).to_homogeneous()
}

fn invert(matrix: &Matrix4<f32>, name: &str) -> Result<Matrix4<f32>> {
    matrix
        .try_inverse()
        .ok_or_else(|| Error::InvalidMatrix(format!("{name} matrix is not invertible")))
}

/// One snapshot of all matrices between object space and the screen.
///
/// Forward transforms are exact. Backward transforms from a pixel use the virtual
/// assumption of `z = 0` in NDC and `w = 1` in clip space, since a pixel alone has no
/// depth.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    object: Matrix4<f32>,
    model: Matrix4<f32>,
    view: Matrix4<f32>,
    projection: Matrix4<f32>,
    object_inv: Matrix4<f32>,
    model_inv: Matrix4<f32>,
    view_inv: Matrix4<f32>,
    projection_inv: Matrix4<f32>,
    mode: ProjectionMode,
    viewport: Viewport,
}

impl Pipeline {
    /// Fails with [`Error::InvalidMatrix`] if any matrix is singular
    pub fn new(
        object: Matrix4<f32>,
        model: Matrix4<f32>,
        view: Matrix4<f32>,
        projection: Matrix4<f32>,
        mode: ProjectionMode,
        viewport: Viewport,
    ) -> Result<Self> {
        Ok(Self {
            object_inv: invert(&object, "object")?,
            model_inv: invert(&model, "model")?,
            view_inv: invert(&view, "view")?,
            projection_inv: invert(&projection, "projection")?,
            object,
            model,
            view,
            projection,
            mode,
            viewport,
        })
    }

    /// Pipeline of `camera` looking at a model transformed by `model`
    pub fn from_camera(
        camera: &Camera,
        model: Matrix4<f32>,
        object: Matrix4<f32>,
        viewport: Viewport,
    ) -> Result<Self> {
        Self::new(
            object,
            model,
            view_matrix(camera),
            camera.projection_matrix(&viewport),
            camera.projection,
            viewport,
        )
    }

    pub fn object(&self) -> &Matrix4<f32> {
        &self.object
    }

    pub fn model(&self) -> &Matrix4<f32> {
        &self.model
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn object_to_local(&self, p: &Point3f) -> Point3f {
        self.object.transform_point(p)
    }

    pub fn local_to_world(&self, p: &Point3f) -> Point3f {
        self.model.transform_point(p)
    }

    pub fn world_to_eye(&self, p: &Point3f) -> Point3f {
        self.view.transform_point(p)
    }

    pub fn eye_to_clip(&self, p: &Point3f) -> Vector4<f32> {
        self.projection * p.to_homogeneous()
    }

    /// Perspective division. Points with `w = 0` produce non-finite output.
    pub fn clip_to_ndc(&self, clip: &Vector4<f32>) -> Point3f {
        Point3f::from(clip.xyz() / clip.w)
    }

    /// Map NDC x/y from `[-1, 1]` to `[0, size - 1]`; NDC z is carried through
    pub fn ndc_to_screen(&self, p: &Point3f) -> Point3f {
        let x = (p.x + 1.0) * 0.5 * self.viewport.max_x();
        let y = match self.viewport.y_axis {
            YAxis::Down => (1.0 - p.y) * 0.5 * self.viewport.max_y(),
            YAxis::Up => (p.y + 1.0) * 0.5 * self.viewport.max_y(),
        };
        Point3f::new(x, y, p.z)
    }

    pub fn local_to_eye(&self, p: &Point3f) -> Point3f {
        self.world_to_eye(&self.local_to_world(p))
    }

    pub fn local_to_clip(&self, p: &Point3f) -> Vector4<f32> {
        self.eye_to_clip(&self.local_to_eye(p))
    }

    pub fn local_to_screen(&self, p: &Point3f) -> Point3f {
        self.ndc_to_screen(&self.clip_to_ndc(&self.local_to_clip(p)))
    }

    pub fn object_to_screen(&self, p: &Point3f) -> Point3f {
        self.local_to_screen(&self.object_to_local(p))
    }

    pub fn screen_to_ndc(&self, p: &Point2f, z_ndc: f32) -> Point3f {
        let x = p.x / self.viewport.max_x() * 2.0 - 1.0;
        let y = match self.viewport.y_axis {
            YAxis::Down => 1.0 - p.y / self.viewport.max_y() * 2.0,
            YAxis::Up => p.y / self.viewport.max_y() * 2.0 - 1.0,
        };
        Point3f::new(x, y, z_ndc)
    }

    pub fn screen_to_ndc_virtual(&self, p: &Point2f) -> Point3f {
        self.screen_to_ndc(p, 0.0)
    }

    pub fn ndc_to_clip_virtual(&self, p: &Point3f) -> Vector4<f32> {
        p.to_homogeneous()
    }

    pub fn clip_to_eye(&self, clip: &Vector4<f32>) -> Point3f {
        let eye = self.projection_inv * clip;
        Point3f::from(eye.xyz() / eye.w)
    }

    pub fn eye_to_world(&self, p: &Point3f) -> Point3f {
        self.view_inv.transform_point(p)
    }

    pub fn world_to_local(&self, p: &Point3f) -> Point3f {
        self.model_inv.transform_point(p)
    }

    pub fn local_to_object(&self, p: &Point3f) -> Point3f {
        self.object_inv.transform_point(p)
    }

    /// Eye-space point under a pixel, at NDC depth `z_ndc` (0 when `None`)
    pub fn screen_to_eye_virtual(&self, p: &Point2f, z_ndc: Option<f32>) -> Point3f {
        let ndc = self.screen_to_ndc(p, z_ndc.unwrap_or(0.0));
        self.clip_to_eye(&self.ndc_to_clip_virtual(&ndc))
    }

    pub fn screen_to_world_virtual(&self, p: &Point2f, z_ndc: Option<f32>) -> Point3f {
        self.eye_to_world(&self.screen_to_eye_virtual(p, z_ndc))
    }

    pub fn screen_to_local_virtual(&self, p: &Point2f, z_ndc: Option<f32>) -> Point3f {
        self.world_to_local(&self.screen_to_world_virtual(p, z_ndc))
    }

    pub fn screen_to_object_virtual(&self, p: &Point2f, z_ndc: Option<f32>) -> Point3f {
        self.local_to_object(&self.screen_to_local_virtual(p, z_ndc))
    }

    /// Camera position in local space
    pub fn eye_in_local(&self) -> Point3f {
        self.world_to_local(&self.eye_to_world(&Point3f::origin()))
    }

    /// Map a direction from eye space to local space
    pub fn eye_vector_to_local(&self, v: &Vector3f) -> Vector3f {
        self.model_inv
            .transform_vector(&self.view_inv.transform_vector(v))
    }

    /// Unit local-space vector of the eye's viewing direction (eye -Z)
    pub fn view_direction_in_local(&self) -> Vector3f {
        self.eye_vector_to_local(&-Vector3f::z()).normalize()
    }

    /// Local-space ray under a pixel, with a unit direction.
    ///
    /// Perspective rays start at the camera and pass through the virtual point.
    /// Orthographic rays start on the near plane and run along the viewing direction,
    /// so geometry between the camera and the virtual point is not missed.
    pub fn raycast(&self, screen: &Point2f) -> Ray {
        match self.mode {
            ProjectionMode::Perspective => {
                let origin = self.eye_in_local();
                let through = self.screen_to_local_virtual(screen, None);
                Ray::new(origin, (through - origin).normalize())
            }
            ProjectionMode::Orthographic => {
                let origin = self.screen_to_local_virtual(screen, Some(-1.0));
                Ray::new(origin, self.view_direction_in_local())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ortho_camera(zoom: f32) -> Camera {
        let mut camera = Camera::default();
        camera.projection = ProjectionMode::Orthographic;
        camera.ortho_zoom = zoom;
        camera
    }

    #[test]
    fn test_ndc_to_screen_corners() {
        let viewport = Viewport::new(101, 51, YAxis::Down);
        let pipeline =
            Pipeline::from_camera(&Camera::default(), Matrix4::identity(), Matrix4::identity(), viewport)
                .unwrap();
        let top_left = pipeline.ndc_to_screen(&Point3f::new(-1.0, 1.0, 0.0));
        assert_relative_eq!(top_left, Point3f::new(0.0, 0.0, 0.0));
        let bottom_right = pipeline.ndc_to_screen(&Point3f::new(1.0, -1.0, 0.0));
        assert_relative_eq!(bottom_right, Point3f::new(100.0, 50.0, 0.0));

        let up = Viewport::new(101, 51, YAxis::Up);
        let pipeline =
            Pipeline::from_camera(&Camera::default(), Matrix4::identity(), Matrix4::identity(), up)
                .unwrap();
        let top_left = pipeline.ndc_to_screen(&Point3f::new(-1.0, 1.0, 0.0));
        assert_relative_eq!(top_left, Point3f::new(0.0, 50.0, 0.0));
        assert_relative_eq!(
            pipeline.screen_to_ndc(&Point2f::new(0.0, 50.0), 0.5),
            Point3f::new(-1.0, 1.0, 0.5)
        );
    }

    #[test]
    fn test_forward_then_backward_round_trip() {
        let object = Matrix4::new_translation(&Vector3f::new(0.5, -0.25, 0.0));
        let model = model_matrix(2.0, UnitQuaternion::from_euler_angles(0.2, 0.4, 0.0), Vector3f::zeros());
        for camera in [Camera::default(), ortho_camera(0.01)] {
            let pipeline = Pipeline::from_camera(&camera, model, object, Viewport::default()).unwrap();
            let p = Point3f::new(0.3, 0.1, -0.2);
            let screen = pipeline.object_to_screen(&p);
            let back = pipeline.screen_to_object_virtual(&screen.xy(), Some(screen.z));
            assert_relative_eq!(back, p, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_orthographic_pixel_size() {
        let camera = ortho_camera(0.5);
        let pipeline =
            Pipeline::from_camera(&camera, Matrix4::identity(), Matrix4::identity(), Viewport::default())
                .unwrap();
        let a = pipeline.screen_to_world_virtual(&Point2f::new(10.0, 10.0), None);
        let b = pipeline.screen_to_world_virtual(&Point2f::new(14.0, 10.0), None);
        assert_relative_eq!((b - a).norm(), 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_raycast_hits_projected_point() {
        let target = Point3f::new(0.4, -0.3, 0.2);
        for camera in [Camera::default(), ortho_camera(0.01)] {
            let pipeline =
                Pipeline::from_camera(&camera, Matrix4::identity(), Matrix4::identity(), Viewport::default())
                    .unwrap();
            let screen = pipeline.local_to_screen(&target);
            let ray = pipeline.raycast(&screen.xy());
            assert_relative_eq!(ray.direction.norm(), 1.0, epsilon = 1e-5);
            // distance from the target to the ray line
            let to_target = target - ray.origin;
            let along = to_target.dot(&ray.direction);
            assert!(along > 0.0);
            assert_relative_eq!((to_target - ray.direction * along).norm(), 0.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_singular_matrix_is_rejected() {
        let result = Pipeline::from_camera(
            &Camera::default(),
            Matrix4::zeros(),
            Matrix4::identity(),
            Viewport::default(),
        );
        assert!(matches!(result, Err(Error::InvalidMatrix(_))));
    }

    #[test]
    fn test_view_matrix_with_parallel_up() {
        let mut camera = Camera::default();
        camera.up = camera.forward();
        let view = view_matrix(&camera);
        assert!(view.iter().all(|v| v.is_finite()));
        assert!(view.try_inverse().is_some());
        let eye = view.transform_point(&camera.target);
        assert_relative_eq!(eye.xy(), nalgebra::Point2::origin(), epsilon = 1e-5);
    }
}
