//! Camera operations: pan, zoom, rotation, zoom-to-fit and near/far selection

use log::{debug, warn};
use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector4};
use serde::{Deserialize, Serialize};

use scenecrate_core::{BBox, Hit, Point3f, Result, Vector3f, VertexManager};

use crate::camera::{Camera, ProjectionMode};
use crate::pipeline::{model_matrix, Pipeline, Point2f, Viewport, YAxis};

/// Tunables of [`ViewControl`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub default_near: f32,
    pub default_far: f32,
    /// Model size at which the near-plane floor equals `default_near`
    pub large_model_size: f32,
    /// Near plane as a fraction of the gap between camera and model
    pub near_gap_fraction: f32,
    /// Far plane as a multiple of the distance to the farthest bbox corner
    pub far_corner_factor: f32,
    /// Iteration budget of perspective zoom-to-fit
    pub loop_cnt_max: usize,
    /// Zoom-to-fit stops once the screen fill factor is this close to 1
    pub factor_tol: f32,
    /// Perspective zoom distance floor, as a fraction of the bbox size
    pub min_zoom_fraction: f32,
    pub y_axis: YAxis,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            fov_y: std::f32::consts::FRAC_PI_4,
            default_near: 0.1,
            default_far: 1000.0,
            large_model_size: 1000.0,
            near_gap_fraction: 0.5,
            far_corner_factor: 3.0,
            loop_cnt_max: 10,
            factor_tol: 1e-2,
            min_zoom_fraction: 0.01,
            y_axis: YAxis::Down,
        }
    }
}

/// Outcome of a zoom-to-fit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomFitReport {
    /// Number of fill-factor evaluations
    pub iterations: usize,
    /// Last screen fill factor; 1 means the binding axis spans the screen exactly
    pub factor: f32,
    pub converged: bool,
}

impl ZoomFitReport {
    fn done(iterations: usize) -> Self {
        Self {
            iterations,
            factor: 1.0,
            converged: true,
        }
    }
}

/// A camera looking at a model, with the operations an interactive viewer drives
#[derive(Debug, Clone, PartialEq)]
pub struct ViewControl {
    pub camera: Camera,
    /// Local → world transform shared by all figures
    pub model: Matrix4<f32>,
    pub viewport: Viewport,
    pub config: ViewConfig,
}

impl ViewControl {
    pub fn new(width: u32, height: u32, config: ViewConfig) -> Self {
        let mut camera = Camera::default();
        camera.fov_y = config.fov_y;
        camera.near = config.default_near;
        camera.far = config.default_far;
        Self {
            camera,
            model: Matrix4::identity(),
            viewport: Viewport::new(width, height, config.y_axis),
            config,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::new(width, height, self.viewport.y_axis);
    }

    pub fn set_model_transform(&mut self, scale: f32, rotation: UnitQuaternion<f32>, translation: Vector3f) {
        self.model = model_matrix(scale, rotation, translation);
    }

    /// Switch projection mode. Near and far fall back to the defaults on a change, since
    /// orthographic bounds may be negative.
    pub fn set_projection(&mut self, mode: ProjectionMode) {
        if self.camera.projection != mode {
            self.camera.projection = mode;
            self.camera.near = self.config.default_near;
            self.camera.far = self.config.default_far;
        }
    }

    /// Transform chain for a figure with the given object matrix
    pub fn pipeline(&self, object: &Matrix4<f32>) -> Result<Pipeline> {
        Pipeline::from_camera(&self.camera, self.model, *object, self.viewport)
    }

    fn local_pipeline(&self) -> Result<Pipeline> {
        self.pipeline(&Matrix4::identity())
    }

    /// Drag the scene so that content under `from` ends up under `to`.
    ///
    /// In perspective mode the drag is scaled to the depth of `reference` (local space),
    /// so that point follows the cursor exactly.
    pub fn pan(&mut self, from: &Point2f, to: &Point2f, reference: &Point3f) -> Result<()> {
        let pipeline = self.local_pipeline()?;
        let start = pipeline.screen_to_world_virtual(from, None);
        let end = pipeline.screen_to_world_virtual(to, None);
        let mut delta = end - start;

        if self.camera.projection == ProjectionMode::Perspective {
            let virtual_depth = -pipeline.screen_to_eye_virtual(from, None).z;
            let reference_depth = -pipeline.local_to_eye(reference).z;
            let depth = if reference_depth > 0.0 {
                reference_depth
            } else {
                self.camera.distance()
            };
            if virtual_depth > f32::EPSILON {
                delta *= depth / virtual_depth;
            }
        }

        self.camera.translate(&-delta);
        Ok(())
    }

    /// Zoom in by `factor` (> 1 enlarges the picture). Non-positive factors are ignored.
    pub fn zoom(&mut self, factor: f32, bbox: &BBox) {
        if !(factor.is_finite() && factor > 0.0) {
            debug!("ignoring zoom factor {factor}");
            return;
        }
        match self.camera.projection {
            ProjectionMode::Orthographic => self.camera.ortho_zoom /= factor,
            ProjectionMode::Perspective => {
                let distance = match bbox.center() {
                    Some(center) => {
                        let center = self.model.transform_point(&center);
                        let floor = self.config.min_zoom_fraction * bbox.diagonal();
                        (center - self.camera.position).norm().max(floor)
                    }
                    None => self.camera.distance(),
                };
                self.camera.move_forward(distance * (1.0 - 1.0 / factor));
            }
        }
    }

    /// Screen-space box of local points; z carries NDC depth
    pub fn screen_bbox(&self, points: &[Point3f]) -> Result<BBox> {
        let pipeline = self.local_pipeline()?;
        let screen: Vec<Point3f> = points.iter().map(|p| pipeline.local_to_screen(p)).collect();
        Ok(BBox::from_points(&screen))
    }

    /// Frame the local `points` so that they fill the screen along the binding axis
    pub fn zoom_fit(&mut self, points: &[Point3f]) -> Result<ZoomFitReport> {
        if points.is_empty() {
            return Ok(ZoomFitReport::done(0));
        }
        match self.camera.projection {
            ProjectionMode::Perspective => self.perspective_zoom_fit(points),
            ProjectionMode::Orthographic => self.ortho_zoom_fit(points),
        }
    }

    /// Exact fit: center, then pick the zoom of the binding axis
    pub fn ortho_zoom_fit(&mut self, points: &[Point3f]) -> Result<ZoomFitReport> {
        let pipeline = self.local_pipeline()?;
        let eye = eye_bbox(&pipeline, points);
        let Some(center) = eye.center() else {
            return Ok(ZoomFitReport::done(0));
        };

        let shift = pipeline.eye_to_world(&Point3f::new(center.x, center.y, 0.0))
            - pipeline.eye_to_world(&Point3f::origin());
        self.camera.translate(&shift);

        let size = eye.size();
        let zoom = (size.x / self.viewport.max_x()).max(size.y / self.viewport.max_y());
        if zoom > f32::EPSILON {
            self.camera.ortho_zoom = zoom;
        }
        debug!("orthographic zoom fit: zoom {}", self.camera.ortho_zoom);
        Ok(ZoomFitReport::done(1))
    }

    /// Iterative fit.
    ///
    /// The camera starts at the distance the field of view predicts for the eye-space
    /// box and is then moved along its view direction until the fill factor is within
    /// `factor_tol` of 1 and the screen box is centered (see [`Self::recenter`]). Each
    /// step moves by `z * (factor - 1)`, with `z` the mean depth of the two points
    /// bounding the binding axis. Once the factor has been seen on both sides of 1,
    /// steps are halved.
    pub fn perspective_zoom_fit(&mut self, points: &[Point3f]) -> Result<ZoomFitReport> {
        if self.camera.projection == ProjectionMode::Orthographic {
            return self.ortho_zoom_fit(points);
        }
        let pipeline = self.local_pipeline()?;
        let eye = eye_bbox(&pipeline, points);
        let (Some(min), Some(max)) = (eye.min(), eye.max()) else {
            return Ok(ZoomFitReport::done(0));
        };
        let half = (max - min) * 0.5;
        let center = pipeline.eye_to_world(&nalgebra::center(&min, &max));
        let tan_y = (self.camera.fov_y * 0.5).tan();
        let tan_x = tan_y * self.viewport.aspect();
        let lateral = (half.x / tan_x).max(half.y / tan_y);

        let forward = self.camera.forward();
        self.camera.target = center;
        self.camera.position = center - forward * (lateral + half.z).max(self.config.default_near);
        if lateral <= f32::EPSILON {
            debug!("zoom fit on points without lateral extent; centered only");
            return Ok(ZoomFitReport::done(0));
        }

        let mut seen_above = false;
        let mut seen_below = false;
        let mut factor = f32::NAN;
        for iteration in 1..=self.config.loop_cnt_max {
            let centered = self.recenter(points)?;
            let pipeline = self.local_pipeline()?;
            let clips: Vec<Vector4<f32>> = points.iter().map(|p| pipeline.local_to_clip(p)).collect();
            if clips.iter().any(|c| c.w <= 0.0) {
                let back = self.camera.distance().max(self.config.default_near);
                debug!("zoom fit iteration {iteration}: points behind the camera, moving back {back}");
                self.camera.move_forward(-back);
                continue;
            }

            let screen: Vec<Point3f> = clips
                .iter()
                .map(|c| pipeline.ndc_to_screen(&pipeline.clip_to_ndc(c)))
                .collect();
            let xs: Vec<f32> = screen.iter().map(|p| p.x).collect();
            let ys: Vec<f32> = screen.iter().map(|p| p.y).collect();
            let (x_lo, x_hi) = extremes(&xs);
            let (y_lo, y_hi) = extremes(&ys);
            let fx = (xs[x_hi] - xs[x_lo]) / self.viewport.max_x();
            let fy = (ys[y_hi] - ys[y_lo]) / self.viewport.max_y();
            let binding = if fx >= fy { [x_lo, x_hi] } else { [y_lo, y_hi] };
            factor = fx.max(fy);
            debug!("zoom fit iteration {iteration}: factor {factor}, centered {centered}");

            if centered && (factor - 1.0).abs() <= self.config.factor_tol {
                return Ok(ZoomFitReport {
                    iterations: iteration,
                    factor,
                    converged: true,
                });
            }
            if factor <= f32::EPSILON {
                break;
            }
            if factor > 1.0 {
                seen_above = true;
            } else {
                seen_below = true;
            }

            // clip w is the eye depth under a perspective projection
            let depth = (clips[binding[0]].w + clips[binding[1]].w) * 0.5;
            let mut step = depth * (factor - 1.0);
            if seen_above && seen_below {
                step *= 0.5;
            }
            self.camera.move_forward(-step);
        }

        warn!(
            "zoom fit stopped after {} iterations with factor {factor}",
            self.config.loop_cnt_max
        );
        Ok(ZoomFitReport {
            iterations: self.config.loop_cnt_max,
            factor,
            converged: false,
        })
    }

    /// Shift the camera sideways until the screen box of `points` is centered to within
    /// `factor_tol / 2` of the viewport size on both axes.
    ///
    /// Screen x of an eye-space point is proportional to `x / w`, so the shift centering
    /// the two points bounding an axis is `(x_lo/w_lo + x_hi/w_hi) / (1/w_lo + 1/w_hi)`.
    /// A shift can change which points bound the axis, hence the loop. Returns whether
    /// the box ended up centered; points behind the camera never are.
    fn recenter(&mut self, points: &[Point3f]) -> Result<bool> {
        let tol = 0.5 * self.config.factor_tol;
        for _ in 0..self.config.loop_cnt_max {
            let pipeline = self.local_pipeline()?;
            let eye: Vec<Point3f> = points.iter().map(|p| pipeline.local_to_eye(p)).collect();
            if eye.iter().any(|p| p.z >= 0.0) {
                return Ok(false);
            }
            let screen: Vec<Point3f> = points.iter().map(|p| pipeline.local_to_screen(p)).collect();
            let Some(center) = BBox::from_points(&screen).center() else {
                return Ok(true);
            };
            let target = self.viewport.center();
            if (center.x - target.x).abs() <= tol * self.viewport.max_x()
                && (center.y - target.y).abs() <= tol * self.viewport.max_y()
            {
                return Ok(true);
            }

            let shift = Point3f::new(centering_shift(&eye, |p| p.x), centering_shift(&eye, |p| p.y), 0.0);
            let shift = pipeline.eye_to_world(&shift) - pipeline.eye_to_world(&Point3f::origin());
            self.camera.translate(&shift);
        }
        Ok(false)
    }

    /// Rotate the model about a local-space center. `angle_x` turns about the eye X axis
    /// and `angle_y` about the eye Y axis, both taken back into local space.
    pub fn rotate_model(&mut self, center: &Point3f, angle_x: f32, angle_y: f32) -> Result<()> {
        let pipeline = self.local_pipeline()?;
        let (Some(axis_x), Some(axis_y)) = (
            Unit::try_new(pipeline.eye_vector_to_local(&Vector3f::x()), f32::EPSILON),
            Unit::try_new(pipeline.eye_vector_to_local(&Vector3f::y()), f32::EPSILON),
        ) else {
            return Ok(());
        };
        let rotation =
            UnitQuaternion::from_axis_angle(&axis_y, angle_y) * UnitQuaternion::from_axis_angle(&axis_x, angle_x);
        self.model = self.model
            * Matrix4::new_translation(&center.coords)
            * rotation.to_homogeneous()
            * Matrix4::new_translation(&-center.coords);
        Ok(())
    }

    /// Turn the camera in place: target and up rotate about the position
    pub fn rotate_camera(&mut self, angle_x: f32, angle_y: f32) {
        let right = Unit::new_normalize(self.camera.right());
        let up = Unit::new_normalize(self.camera.true_up());
        let rotation = UnitQuaternion::from_axis_angle(&up, angle_y) * UnitQuaternion::from_axis_angle(&right, angle_x);
        let offset = self.camera.target - self.camera.position;
        self.camera.target = self.camera.position + rotation * offset;
        self.camera.up = rotation * self.camera.up;
    }

    /// Roll the camera about its view direction
    pub fn tilt(&mut self, angle: f32) {
        let axis = Unit::new_normalize(self.camera.forward());
        self.camera.up = UnitQuaternion::from_axis_angle(&axis, angle) * self.camera.up;
    }

    /// Choose near and far planes that enclose a local-space box.
    ///
    /// Perspective: with the camera in front of the whole box, near is a fraction of the
    /// gap (floored by a size-proportional minimum) and far a multiple of the distance to
    /// the farthest corner. Otherwise the configured defaults are used. Orthographic:
    /// symmetric bounds around the eye covering the box's depth range.
    pub fn update_near_far(&mut self, bbox: &BBox) -> Result<()> {
        let config = &self.config;
        if bbox.is_empty() {
            self.camera.near = config.default_near;
            self.camera.far = config.default_far;
            return Ok(());
        }
        let pipeline = self.local_pipeline()?;
        let corners: Vec<Point3f> = bbox
            .world_corners()
            .iter()
            .map(|c| pipeline.local_to_eye(c))
            .collect();

        if self.camera.projection == ProjectionMode::Orthographic {
            let reach = corners
                .iter()
                .map(|p| p.z.abs())
                .fold(config.default_near, f32::max)
                * config.far_corner_factor;
            self.camera.near = -reach;
            self.camera.far = reach;
            return Ok(());
        }

        let nearest = corners.iter().map(|p| -p.z).fold(f32::INFINITY, f32::min);
        if nearest <= 0.0 {
            debug!("camera is inside the model's depth range; using default near/far");
            self.camera.near = config.default_near;
            self.camera.far = config.default_far;
            return Ok(());
        }

        let size = BBox::from_points(&corners).diagonal();
        let floor = config.default_near * size / config.large_model_size;
        let near = (nearest * config.near_gap_fraction).max(floor);
        let farthest = corners.iter().map(|p| p.coords.norm()).fold(0.0, f32::max);
        let mut far = farthest * config.far_corner_factor;
        if far <= near {
            far = near * config.far_corner_factor.max(2.0);
        }
        debug!("near/far set to {near}/{far}");
        self.camera.near = near;
        self.camera.far = far;
        Ok(())
    }

    /// Nearest triangle of `manager` under a pixel
    pub fn pick(&self, manager: &VertexManager, screen: &Point2f) -> Result<Option<Hit>> {
        let ray = self.local_pipeline()?.raycast(screen);
        Ok(manager.hit_test(&ray))
    }
}

impl Default for ViewControl {
    fn default() -> Self {
        Self::new(800, 600, ViewConfig::default())
    }
}

fn eye_bbox(pipeline: &Pipeline, points: &[Point3f]) -> BBox {
    let eye: Vec<Point3f> = points.iter().map(|p| pipeline.local_to_eye(p)).collect();
    BBox::from_points(&eye)
}

/// Lateral eye-space shift that centers the two points bounding one screen axis. All
/// points must be in front of the eye.
fn centering_shift(eye: &[Point3f], coord: impl Fn(&Point3f) -> f32) -> f32 {
    let ratios: Vec<f32> = eye.iter().map(|p| coord(p) / -p.z).collect();
    let (lo, hi) = extremes(&ratios);
    let (w_lo, w_hi) = (-eye[lo].z, -eye[hi].z);
    (coord(&eye[lo]) / w_lo + coord(&eye[hi]) / w_hi) / (1.0 / w_lo + 1.0 / w_hi)
}

/// Indices of the smallest and largest value
fn extremes(values: &[f32]) -> (usize, usize) {
    let mut lo = 0;
    let mut hi = 0;
    for (i, &v) in values.iter().enumerate() {
        if v < values[lo] {
            lo = i;
        }
        if v > values[hi] {
            hi = i;
        }
    }
    (lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> Vec<Point3f> {
        vec![
            Point3f::new(-1.0, -1.0, 0.0),
            Point3f::new(1.0, -1.0, 0.0),
            Point3f::new(1.0, 1.0, 0.0),
            Point3f::new(-1.0, 1.0, 0.0),
        ]
    }

    fn ortho_control() -> ViewControl {
        let mut control = ViewControl::new(801, 601, ViewConfig::default());
        control.set_projection(ProjectionMode::Orthographic);
        control
    }

    #[test]
    fn test_config_defaults() {
        let config = ViewConfig::default();
        assert_eq!(config.loop_cnt_max, 10);
        assert_relative_eq!(config.factor_tol, 1e-2);
        assert_eq!(config.y_axis, YAxis::Down);
    }

    #[test]
    fn test_ortho_pan_moves_by_pixels_times_zoom() {
        let mut control = ortho_control();
        control.camera.ortho_zoom = 0.5;
        let before = control.camera.position;
        control
            .pan(&Point2f::new(100.0, 100.0), &Point2f::new(110.0, 100.0), &Point3f::origin())
            .unwrap();
        assert_relative_eq!(control.camera.position.x, before.x - 5.0, epsilon = 1e-3);
        assert_relative_eq!(control.camera.position.y, before.y, epsilon = 1e-3);
    }

    #[test]
    fn test_perspective_pan_tracks_reference() {
        let mut control = ViewControl::default();
        let reference = Point3f::new(0.5, 0.25, -3.0);
        let start = control.local_pipeline().unwrap().local_to_screen(&reference);
        let to = Point2f::new(start.x + 40.0, start.y - 25.0);
        control.pan(&start.xy(), &to, &reference).unwrap();

        let end = control.local_pipeline().unwrap().local_to_screen(&reference);
        assert_relative_eq!(end.x, to.x, epsilon = 1e-2);
        assert_relative_eq!(end.y, to.y, epsilon = 1e-2);
    }

    #[test]
    fn test_zoom() {
        let mut control = ortho_control();
        control.zoom(2.0, &BBox::new());
        assert_relative_eq!(control.camera.ortho_zoom, 0.005);
        control.zoom(-1.0, &BBox::new());
        assert_relative_eq!(control.camera.ortho_zoom, 0.005);

        let mut control = ViewControl::default();
        let bbox = BBox::from_points(&square());
        control.zoom(2.0, &bbox);
        // halfway to the bbox center
        assert_relative_eq!(control.camera.position.z, 2.5, epsilon = 1e-5);
        control.zoom(0.5, &bbox);
        assert_relative_eq!(control.camera.position.z, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_ortho_zoom_fit_is_exact() {
        let mut control = ortho_control();
        let points: Vec<Point3f> = square()
            .iter()
            .map(|p| p + Vector3f::new(3.0, -2.0, 0.0))
            .collect();
        let report = control.zoom_fit(&points).unwrap();
        assert!(report.converged);
        assert_relative_eq!(control.camera.ortho_zoom, 2.0 / 600.0, epsilon = 1e-7);

        let screen = control.screen_bbox(&points).unwrap();
        let size = screen.size();
        assert_relative_eq!(size.y, 600.0, epsilon = 1e-2);
        assert_relative_eq!(size.x, 600.0, epsilon = 1e-2);
        let center = screen.center().unwrap();
        assert_relative_eq!(center.x, 400.0, epsilon = 1e-2);
        assert_relative_eq!(center.y, 300.0, epsilon = 1e-2);
    }

    #[test]
    fn test_perspective_zoom_fit_converges_on_plane() {
        let mut control = ViewControl::new(801, 601, ViewConfig::default());
        let report = control.zoom_fit(&square()).unwrap();
        assert!(report.converged, "{report:?}");
        assert!(report.iterations <= control.config.loop_cnt_max);
        assert!((report.factor - 1.0).abs() <= control.config.factor_tol);

        let screen = control.screen_bbox(&square()).unwrap();
        assert_relative_eq!(screen.size().y, 600.0, epsilon = 600.0 * 2e-2);
        let center = screen.center().unwrap();
        assert_relative_eq!(center.x, 400.0, epsilon = 1.0);
        assert_relative_eq!(center.y, 300.0, epsilon = 1.0);
    }

    #[test]
    fn test_perspective_zoom_fit_keeps_deep_rotated_models_on_screen() {
        let mut box_corners = Vec::new();
        for &x in &[1000.0, 1001.0] {
            for &y in &[1000.0, 1001.0] {
                for &z in &[1000.0, 1001.0] {
                    box_corners.push(Point3f::new(x, y, z));
                }
            }
        }
        let rod = vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(0.0, 0.0, 100.0)];
        let cases = [
            (box_corners, UnitQuaternion::from_euler_angles(1.4, 0.7, 0.0)),
            (rod, UnitQuaternion::from_euler_angles(0.7, 0.0, 0.0)),
        ];

        for (points, rotation) in cases {
            let mut control = ViewControl::new(801, 601, ViewConfig::default());
            control.set_model_transform(1.0, rotation, Vector3f::zeros());
            let report = control.zoom_fit(&points).unwrap();
            assert!(report.converged, "{report:?}");

            let tol = control.config.factor_tol;
            let screen = control.screen_bbox(&points).unwrap();
            let (min, max) = (screen.min().unwrap(), screen.max().unwrap());
            assert!(min.x >= -tol * 800.0 && min.y >= -tol * 600.0, "{min:?}");
            assert!(max.x <= 800.0 * (1.0 + tol) && max.y <= 600.0 * (1.0 + tol), "{max:?}");
            let center = screen.center().unwrap();
            assert!((center.x - 400.0).abs() <= 0.5 * tol * 800.0, "{center:?}");
            assert!((center.y - 300.0).abs() <= 0.5 * tol * 600.0, "{center:?}");
        }
    }

    #[test]
    fn test_centering_shift_centers_points_at_different_depths() {
        let eye = [Point3f::new(-1.0, 0.0, -2.0), Point3f::new(3.0, 0.0, -10.0)];
        let s = centering_shift(&eye, |p| p.x);
        let lo = (eye[0].x - s) / 2.0;
        let hi = (eye[1].x - s) / 10.0;
        assert_relative_eq!(lo + hi, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zoom_fit_recovers_from_points_behind_camera() {
        let mut control = ViewControl::new(801, 601, ViewConfig::default());
        let points: Vec<Point3f> = square()
            .iter()
            .map(|p| p + Vector3f::new(0.0, 0.0, 10.0))
            .collect();
        let report = control.zoom_fit(&points).unwrap();
        assert!(report.factor.is_finite());
        let pipeline = control.local_pipeline().unwrap();
        assert!(points.iter().all(|p| pipeline.local_to_clip(p).w > 0.0));
    }

    #[test]
    fn test_zoom_fit_of_single_point_centers_it() {
        let mut control = ViewControl::default();
        let point = Point3f::new(2.0, 1.0, 0.0);
        let report = control.zoom_fit(&[point]).unwrap();
        assert_eq!(report.iterations, 0);
        assert_relative_eq!(control.camera.target, point, epsilon = 1e-5);
    }

    #[test]
    fn test_near_far_outside_model() {
        let mut control = ViewControl::default();
        let bbox = BBox::from_points(&square());
        control.update_near_far(&bbox).unwrap();
        // camera at z = 5, model at z = 0
        assert_relative_eq!(control.camera.near, 2.5, epsilon = 1e-4);
        let farthest = (1.0f32 + 1.0 + 25.0).sqrt();
        assert_relative_eq!(control.camera.far, 3.0 * farthest, epsilon = 1e-3);
    }

    #[test]
    fn test_near_far_inside_model_uses_defaults() {
        let mut control = ViewControl::default();
        let bbox = BBox::from_points(&[Point3f::new(-10.0, -10.0, -10.0), Point3f::new(10.0, 10.0, 10.0)]);
        control.update_near_far(&bbox).unwrap();
        assert_relative_eq!(control.camera.near, 0.1);
        assert_relative_eq!(control.camera.far, 1000.0);

        control.set_projection(ProjectionMode::Orthographic);
        control.update_near_far(&bbox).unwrap();
        assert!(control.camera.near < 0.0);
        assert_relative_eq!(control.camera.far, -control.camera.near);
        assert!(control.camera.far >= 15.0 * 3.0);
    }

    #[test]
    fn test_rotate_model_keeps_center_fixed() {
        let mut control = ViewControl::default();
        let center = Point3f::new(1.0, 0.0, 0.0);
        let sample = Point3f::new(2.0, 0.0, 0.0);
        control.rotate_model(&center, 0.0, std::f32::consts::FRAC_PI_2).unwrap();

        assert_relative_eq!(control.model.transform_point(&center), center, epsilon = 1e-5);
        // a quarter turn about the screen's vertical axis moves +X onto -Z
        assert_relative_eq!(
            control.model.transform_point(&sample),
            Point3f::new(1.0, 0.0, -1.0),
            epsilon = 1e-5
        );
    }

    #[test]
    fn test_rotate_camera_and_tilt() {
        let mut control = ViewControl::default();
        let position = control.camera.position;
        control.rotate_camera(0.0, std::f32::consts::FRAC_PI_2);
        assert_eq!(control.camera.position, position);
        assert_relative_eq!(control.camera.forward(), -Vector3f::x(), epsilon = 1e-5);

        control.tilt(std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(control.camera.forward(), -Vector3f::x(), epsilon = 1e-5);
        assert_relative_eq!(control.camera.up.dot(&Vector3f::y()), 0.0, epsilon = 1e-5);
    }
}
