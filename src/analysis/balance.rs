//! Balance correction: a rotation about one of the footprint's principal
//! axes, through the footprint centroid, that brings the center of mass
//! projection toward that axis. The result is converted into an incremental
//! base residual for the trajectory editor.

use crate::support::SupportAnalysis;
use crate::edit_error::EditError;
use crate::editor::TrajectoryEditor;
use crate::residual::BaseResidual;
use nalgebra::{Point2, Point3, Unit, UnitQuaternion, Vector2, Vector3};
use tracing::debug;

/// Which principal axis of the footprint the correction rotates about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisChoice {
    Major,
    Minor,
}

/// A corrective rotation: `angle` radians about `axis` through `pivot`.
#[derive(Debug, Clone)]
pub struct BalanceCorrection {
    /// World-space rotation axis, the chosen principal direction embedded in
    /// the ground plane.
    pub axis: Unit<Vector3<f64>>,
    /// Signed rotation angle, clamped to the caller's maximum.
    pub angle: f64,
    /// Footprint centroid on the ground plane, the point the rotation pivots
    /// around.
    pub pivot: Point3<f64>,
}

/// Distances below this are already "on the axis", no correction needed.
const DISTANCE_EPSILON: f64 = 1e-6;

/// A center of mass this close to the ground cannot be moved by rotation.
const HEIGHT_EPSILON: f64 = 1e-6;

/// Probe angle used to pick the rotation sign.
const PROBE_ANGLE: f64 = 1e-3;

/// Compute the corrective rotation, or `None` when no meaningful correction
/// exists: the COM projection already lies on the axis, or the COM sits at
/// ground level where rotation cannot reduce the distance.
pub fn solve(
    analysis: &SupportAnalysis,
    axis_choice: AxisChoice,
    max_angle: f64,
) -> Option<BalanceCorrection> {
    let direction = match axis_choice {
        AxisChoice::Major => analysis.axes[0].direction,
        AxisChoice::Minor => analysis.axes[1].direction,
    };

    let com_ground = Point2::new(analysis.com.x, analysis.com.y);
    let distance = distance_to_line(&com_ground, &analysis.centroid, &direction);
    if distance < DISTANCE_EPSILON {
        debug!("COM projection is on the axis already, no correction");
        return None;
    }

    let height = analysis.com.z;
    if height.abs() < HEIGHT_EPSILON {
        debug!("COM at ground level, rotation cannot move its projection");
        return None;
    }

    let exact_angle = distance.atan2(height.abs());

    let axis = Unit::new_normalize(Vector3::new(direction.x, direction.y, 0.0));
    let pivot = Point3::new(analysis.centroid.x, analysis.centroid.y, 0.0);

    // Try a small probe rotation both ways; keep the sign that moves the COM
    // projection toward the axis.
    let sign = if probe_distance(analysis, &axis, &pivot, &direction, PROBE_ANGLE) < distance {
        1.0
    } else {
        -1.0
    };

    // Clamped: never rotate past the user's bound even when the exact angle
    // is larger.
    let angle = sign * exact_angle.abs().min(max_angle);
    Some(BalanceCorrection { axis, angle, pivot })
}

/// Rotate the COM by `angle` about the candidate axis and measure the
/// resulting projected distance to the line.
fn probe_distance(
    analysis: &SupportAnalysis,
    axis: &Unit<Vector3<f64>>,
    pivot: &Point3<f64>,
    direction: &Vector2<f64>,
    angle: f64,
) -> f64 {
    let rotation = UnitQuaternion::from_axis_angle(axis, angle);
    let rotated = pivot + rotation * (analysis.com - pivot);
    let rotated_ground = Point2::new(rotated.x, rotated.y);
    distance_to_line(&rotated_ground, &Point2::new(pivot.x, pivot.y), direction)
}

/// Perpendicular distance from `point` to the infinite line through `origin`
/// along `direction` (2D cross product).
fn distance_to_line(point: &Point2<f64>, origin: &Point2<f64>, direction: &Vector2<f64>) -> f64 {
    let to_point = point - origin;
    (direction.x * to_point.y - direction.y * to_point.x).abs() / direction.norm()
}

/// Convert the correction into an incremental base residual at `frame` and
/// accumulate it into the editor: the rotation about the pivot displaces the
/// base position by `R·(p - pivot) - (p - pivot)`, and the rotation delta is
/// left-multiplied onto whatever residual the keyframe already stores. A
/// zero residual keyframe is created first if the frame has none.
pub fn apply_as_residual(
    editor: &mut TrajectoryEditor,
    frame: usize,
    correction: &BalanceCorrection,
) -> Result<(), EditError> {
    let base = editor
        .base_state(frame)
        .ok_or(EditError::FrameOutOfRange { frame, frame_count: editor.frame_count() })?;

    let rotation = UnitQuaternion::from_axis_angle(&correction.axis, correction.angle);
    let offset = Point3::from(base.base.translation.vector) - correction.pivot;
    let position_delta = rotation * offset - offset;

    editor.accumulate_base_residual(
        frame,
        &BaseResidual { position: position_delta, rotation },
    )
}
