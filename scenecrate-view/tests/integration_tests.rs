//! Integration tests for scenecrate-view
//!
//! These tests run camera operations against figures registered with a vertex
//! manager and check that screen positions, fits and picks agree.

use approx::assert_relative_eq;
use nalgebra::{Matrix4, UnitQuaternion, Vector3};
use scenecrate_core::*;
use scenecrate_view::*;

fn create_grid(name: &str, n: usize) -> TriangleFigure {
    let mut figure = TriangleFigure::new(name);
    let p = |x: usize, y: usize| Point3f::new(x as f32, y as f32, 0.0);
    for y in 0..n {
        for x in 0..n {
            figure
                .push(Triangle::new(p(x, y), p(x + 1, y), p(x + 1, y + 1)))
                .unwrap();
            figure
                .push(Triangle::new(p(x, y), p(x + 1, y + 1), p(x, y + 1)))
                .unwrap();
        }
    }
    figure
}

fn create_cube_corners() -> Vec<Point3f> {
    let mut corners = Vec::new();
    for &x in &[-1.0, 1.0] {
        for &y in &[-1.0, 1.0] {
            for &z in &[-1.0, 1.0] {
                corners.push(Point3f::new(x, y, z));
            }
        }
    }
    corners
}

fn framed_scene(mode: ProjectionMode) -> (VertexManager, FigureId, ViewControl) {
    let mut manager = VertexManager::new();
    let id = manager.add_figure(create_grid("grid", 4)).unwrap();
    let mut view = ViewControl::new(640, 480, ViewConfig::default());
    view.set_projection(mode);
    view.zoom_fit(&manager.bbox().corners()).unwrap();
    view.update_near_far(&manager.bbox()).unwrap();
    (manager, id, view)
}

#[test]
fn test_pick_matches_projection() {
    for mode in [ProjectionMode::Perspective, ProjectionMode::Orthographic] {
        let (manager, id, view) = framed_scene(mode);
        let target = Point3f::new(1.3, 2.6, 0.0);
        let screen = view.pipeline(&Matrix4::identity()).unwrap().local_to_screen(&target);

        let hit = view.pick(&manager, &screen.xy()).unwrap().unwrap();
        assert_eq!(hit.figure, id);
        assert_relative_eq!(hit.point, target, epsilon = 1e-3);
    }
}

#[test]
fn test_pick_outside_model_misses() {
    let (manager, _, view) = framed_scene(ProjectionMode::Perspective);
    let screen = view
        .pipeline(&Matrix4::identity())
        .unwrap()
        .local_to_screen(&Point3f::new(-0.5, 2.0, 0.0));
    assert!(view.pick(&manager, &screen.xy()).unwrap().is_none());
}

#[test]
fn test_pick_respects_object_matrix() {
    let mut manager = VertexManager::new();
    let mut grid = create_grid("moved", 2);
    let object = Matrix4::new_translation(&Vector3::new(3.0, 0.0, 0.0));
    grid.set_object_matrix(object);
    let id = manager.add_figure(grid).unwrap();

    let mut view = ViewControl::default();
    view.zoom_fit(&manager.bbox().corners()).unwrap();

    let pipeline = view.pipeline(&object).unwrap();
    let screen = pipeline.object_to_screen(&Point3f::new(0.5, 1.5, 0.0));
    let hit = view.pick(&manager, &screen.xy()).unwrap().unwrap();
    assert_eq!(hit.figure, id);
    assert_relative_eq!(hit.point, Point3f::new(3.5, 1.5, 0.0), epsilon = 1e-3);
}

#[test]
fn test_zoom_fit_rotated_cube() {
    let mut view = ViewControl::new(1024, 768, ViewConfig::default());
    view.set_model_transform(
        1.5,
        UnitQuaternion::from_euler_angles(0.4, 0.6, 0.0),
        Vector3::new(2.0, -1.0, 0.5),
    );
    let corners = create_cube_corners();
    let report = view.zoom_fit(&corners).unwrap();
    assert!(report.converged, "{report:?}");
    assert!(report.iterations <= view.config.loop_cnt_max);

    let screen = view.screen_bbox(&corners).unwrap();
    let (min, max) = (screen.min().unwrap(), screen.max().unwrap());
    let tol = view.config.factor_tol;
    assert!(min.x >= -tol * 1023.0 && min.y >= -tol * 767.0, "{min:?}");
    assert!(max.x <= 1023.0 * (1.0 + tol) && max.y <= 767.0 * (1.0 + tol), "{max:?}");
    let fill = ((max.x - min.x) / 1023.0).max((max.y - min.y) / 767.0);
    assert_relative_eq!(fill, report.factor, epsilon = 1e-4);
    assert_relative_eq!(fill, 1.0, epsilon = tol);
}

#[test]
fn test_pan_then_fit_restores_centering() {
    let mut view = ViewControl::default();
    let corners = create_cube_corners();
    view.zoom_fit(&corners).unwrap();
    let centered = view.screen_bbox(&corners).unwrap().center().unwrap();

    view.pan(
        &Point2f::new(100.0, 100.0),
        &Point2f::new(250.0, 180.0),
        &Point3f::origin(),
    )
    .unwrap();
    let moved = view.screen_bbox(&corners).unwrap().center().unwrap();
    assert!((moved - centered).norm() > 50.0);

    assert!(view.zoom_fit(&corners).unwrap().converged);
    let refit = view.screen_bbox(&corners).unwrap().center().unwrap();
    let target = view.viewport.center();
    let tol = 0.5 * view.config.factor_tol;
    assert!((refit.x - target.x).abs() <= tol * view.viewport.max_x(), "{refit:?}");
    assert!((refit.y - target.y).abs() <= tol * view.viewport.max_y(), "{refit:?}");
}

#[test]
fn test_saved_view_reproduces_screen_positions() {
    let (_, _, mut view) = framed_scene(ProjectionMode::Perspective);
    let sample = Point3f::new(2.0, 3.0, 0.0);
    let before = view.pipeline(&Matrix4::identity()).unwrap().local_to_screen(&sample);
    let saved = view.camera.view_string();
    let distance = view.camera.distance();

    view.camera.orbit(0.7, -0.2);
    view.camera.restore_view(&saved, distance).unwrap();
    let after = view.pipeline(&Matrix4::identity()).unwrap().local_to_screen(&sample);
    assert_relative_eq!(after.xy(), before.xy(), epsilon = 1e-2);
}

#[test]
fn test_near_far_encloses_model_after_fit() {
    let (manager, _, view) = framed_scene(ProjectionMode::Perspective);
    let pipeline = view.pipeline(&Matrix4::identity()).unwrap();
    for corner in manager.bbox().corners() {
        let depth = -pipeline.local_to_eye(&corner).z;
        assert!(depth > view.camera.near && depth < view.camera.far);
        let ndc_z = pipeline.local_to_screen(&corner).z;
        assert!((-1.0..=1.0).contains(&ndc_z));
    }
}
