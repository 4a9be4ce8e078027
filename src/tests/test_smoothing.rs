//! Range smoothing: endpoints stay fixed, interior keyframes are re-derived
//! from the interpolated overlay, and every precondition rejects before any
//! mutation happens.

use crate::edit_error::EditError;
use crate::editor::TrajectoryEditor;
use crate::residual::slerp_aligned;
use crate::trajectory::Pose;
use nalgebra::{Translation3, UnitQuaternion, Vector3};

fn editor_with_frames(count: usize) -> TrajectoryEditor {
    let mut csv = String::new();
    for i in 0..count {
        csv.push_str(&format!("{},0,1,0,0,0,1,0.0,0.0\n", i as f64 * 0.1));
    }
    TrajectoryEditor::from_csv(&csv)
}

#[test]
fn test_smoothing_preserves_endpoints_and_midpoint_lerps() {
    let mut editor = editor_with_frames(21);
    editor.add_keyframe(5, &[1.0, 10.0], None).unwrap();
    editor.add_keyframe(10, &[100.0, -100.0], None).unwrap();
    editor.add_keyframe(15, &[3.0, 30.0], None).unwrap();

    let before_first = editor.combined_state(5).unwrap();
    let before_last = editor.combined_state(15).unwrap();

    editor.smooth_range(&[5, 10, 15]).unwrap();

    let after_first = editor.combined_state(5).unwrap();
    let after_last = editor.combined_state(15).unwrap();
    assert_eq!(before_first, after_first, "first endpoint must not move");
    assert_eq!(before_last, after_last, "last endpoint must not move");

    // Frame 10 sits at t = 0.5 between the endpoints' composed values.
    let middle = editor.combined_state(10).unwrap();
    assert!((middle.joints[0] - 2.0).abs() < 1e-9);
    assert!((middle.joints[1] - 20.0).abs() < 1e-9);
}

#[test]
fn test_smoothing_slerps_base_orientation() {
    let mut editor = editor_with_frames(21);
    let start = Pose::from_parts(
        Translation3::new(0.5, 0.0, 1.0),
        UnitQuaternion::identity(),
    );
    let end = Pose::from_parts(
        Translation3::new(1.5, 0.4, 1.0),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.0),
    );
    editor.add_keyframe(5, &[0.0, 0.0], Some(&start)).unwrap();
    // A deliberately wild middle keyframe the smoothing must pull in line.
    let wild = Pose::from_parts(
        Translation3::new(-3.0, 2.0, 0.2),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 2.0),
    );
    editor.add_keyframe(10, &[0.0, 0.0], Some(&wild)).unwrap();
    editor.add_keyframe(15, &[0.0, 0.0], Some(&end)).unwrap();

    editor.smooth_range(&[5, 10, 15]).unwrap();

    let middle = editor.combined_state(10).unwrap();
    let expected_position = start
        .translation
        .vector
        .lerp(&end.translation.vector, 0.5);
    let expected_rotation = slerp_aligned(&start.rotation, &end.rotation, 0.5);
    assert!((middle.base.translation.vector - expected_position).norm() < 1e-9);
    assert!(middle.base.rotation.angle_to(&expected_rotation) < 1e-9);
}

#[test]
fn test_smoothing_rejects_small_selection() {
    let mut editor = editor_with_frames(21);
    editor.add_keyframe(5, &[1.0, 1.0], None).unwrap();
    editor.add_keyframe(15, &[2.0, 2.0], None).unwrap();
    assert!(matches!(
        editor.smooth_range(&[5, 15]),
        Err(EditError::SelectionTooSmall { selected: 2 })
    ));
}

#[test]
fn test_smoothing_rejects_non_contiguous_selection() {
    let mut editor = editor_with_frames(21);
    editor.add_keyframe(5, &[1.0, 1.0], None).unwrap();
    editor.add_keyframe(8, &[9.0, 9.0], None).unwrap();
    editor.add_keyframe(10, &[2.0, 2.0], None).unwrap();
    editor.add_keyframe(15, &[3.0, 3.0], None).unwrap();

    // Keyframe 8 lies strictly inside the selection but is not selected.
    let before = editor.combined_state(10).unwrap();
    let result = editor.smooth_range(&[5, 10, 15]);
    assert!(matches!(
        result,
        Err(EditError::SelectionNotContiguous { skipped_frame: 8 })
    ));
    // Rejected before any mutation: the interior keyframe is untouched.
    assert_eq!(editor.combined_state(10).unwrap(), before);
}

#[test]
fn test_smoothing_rejects_non_keyframe_selection() {
    let mut editor = editor_with_frames(21);
    editor.add_keyframe(5, &[1.0, 1.0], None).unwrap();
    editor.add_keyframe(10, &[2.0, 2.0], None).unwrap();
    assert!(matches!(
        editor.smooth_range(&[5, 10, 15]),
        Err(EditError::NotAKeyframe { frame: 15 })
    ));
}

#[test]
fn test_smoothing_joint_only_selection_stays_joint_only() {
    let mut editor = editor_with_frames(21);
    editor.add_keyframe(5, &[1.0, 0.0], None).unwrap();
    editor.add_keyframe(10, &[5.0, 5.0], None).unwrap();
    editor.add_keyframe(15, &[3.0, 0.0], None).unwrap();

    editor.smooth_range(&[5, 10, 15]).unwrap();

    // No keyframe in the selection edits the base, so smoothing must not
    // invent base residuals.
    assert!(editor.keyframes().get(10).unwrap().residual.base.is_none());
    assert!(editor.base_residual(10).is_none());
}
