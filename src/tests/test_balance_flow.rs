//! The full analysis-to-residual loop: pose a body, analyze its support,
//! solve for a corrective rotation and feed it back into the editor.

use crate::balance::{apply_as_residual, solve, AxisChoice};
use crate::body::{SimpleBody, SimpleLink};
use crate::editor::TrajectoryEditor;
use crate::support::analyze;
use nalgebra::{Isometry3, Point3, Translation3, UnitQuaternion};

/// A flat foot plate on the ground plus a heavy mass hanging off-axis.
fn leaning_body(com_offset_y: f64) -> SimpleBody {
    let mut body = SimpleBody::default();
    body.links.push(SimpleLink {
        world_pose: Isometry3::identity(),
        mass: None,
        inertial_offset: None,
        vertices: vec![
            Point3::new(-0.4, -0.15, 0.0),
            Point3::new(0.4, -0.15, 0.0),
            Point3::new(0.4, 0.15, 0.0),
            Point3::new(-0.4, 0.15, 0.0),
        ],
    });
    body.links.push(SimpleLink {
        world_pose: Isometry3::from_parts(
            Translation3::new(0.0, com_offset_y, 1.0),
            UnitQuaternion::identity(),
        ),
        mass: Some(15.0),
        inertial_offset: None,
        vertices: vec![],
    });
    body
}

#[test]
fn test_analysis_axes_follow_the_foot_plate() {
    let body = leaning_body(0.1);
    let analysis = analyze(&body, 0.2).expect("foot plate is below threshold");
    // The plate is longer along x, so the major axis must align with x.
    assert!(analysis.axes[0].direction.x.abs() > 0.99);
    assert!((analysis.com.y - 0.1).abs() < 1e-9);
    assert!((analysis.com.z - 1.0).abs() < 1e-9);
}

#[test]
fn test_correction_reduces_com_offset_and_lands_in_editor() {
    let body = leaning_body(0.1);
    let analysis = analyze(&body, 0.2).unwrap();

    let correction =
        solve(&analysis, AxisChoice::Major, 0.5).expect("off-axis COM needs correction");
    // exact angle = atan2(0.1, 1.0), well inside the clamp.
    assert!((correction.angle.abs() - (0.1f64).atan2(1.0)).abs() < 1e-9);

    // The corrective rotation moves the COM projection onto the axis.
    let rotation = UnitQuaternion::from_axis_angle(&correction.axis, correction.angle);
    let corrected = correction.pivot + rotation * (analysis.com - correction.pivot);
    assert!(corrected.y.abs() < 1e-6, "COM projection must land on the major axis");

    let mut editor = TrajectoryEditor::from_csv("0,0,1,0,0,0,1,0.0");
    apply_as_residual(&mut editor, 0, &correction).unwrap();
    let residual = editor
        .keyframes()
        .get(0)
        .and_then(|k| k.residual.base.clone())
        .expect("correction stored as base residual");
    assert!((residual.rotation.angle() - correction.angle.abs()).abs() < 1e-9);

    // The combined pose now carries the corrective tilt.
    let combined = editor.combined_state(0).unwrap();
    assert!(combined.base.rotation.angle() > 0.0);
}

#[test]
fn test_balanced_body_needs_no_correction() {
    let body = leaning_body(0.0);
    let analysis = analyze(&body, 0.2).unwrap();
    assert!(solve(&analysis, AxisChoice::Major, 0.5).is_none());
}

#[test]
fn test_solver_output_is_a_snapshot() {
    // The solver consumes the analysis by reference and owns its result; a
    // later re-analysis cannot change an already computed correction.
    let analysis = analyze(&leaning_body(0.2), 0.2).unwrap();
    let correction = solve(&analysis, AxisChoice::Major, 0.5).unwrap();
    let angle_before = correction.angle;
    let _newer = analyze(&leaning_body(-0.2), 0.2).unwrap();
    assert_eq!(correction.angle, angle_before);
}
