//! Residuals: the corrections a keyframe stores against the immutable base
//! trajectory. Joint and position residuals are additive; the orientation
//! residual is compositional, `displayed = base * residual` with the residual
//! expressed in the base pose's local frame. Encoding and decoding must use
//! the same multiplication order or round trips silently corrupt orientation.

use nalgebra::{UnitQuaternion, Vector3};

/// Correction of the base pose stored at a keyframe. The position part is an
/// additive world-space offset; the rotation part right-multiplies the base
/// quaternion.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseResidual {
    pub position: Vector3<f64>,
    pub rotation: UnitQuaternion<f64>,
}

impl BaseResidual {
    /// The "no correction" residual.
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Encode the residual that turns `base` into `displayed`:
    /// position difference plus `base⁻¹ * displayed` for the rotation.
    pub fn encode(base: &crate::trajectory::Pose, displayed: &crate::trajectory::Pose) -> Self {
        Self {
            position: displayed.translation.vector - base.translation.vector,
            rotation: extract_rotation(&base.rotation, &displayed.rotation),
        }
    }
}

/// Correction stored at one keyframe: per-joint additive offsets plus an
/// optional base pose correction.
#[derive(Debug, Clone, PartialEq)]
pub struct Residual {
    pub joints: Vec<f64>,
    pub base: Option<BaseResidual>,
}

impl Residual {
    pub fn zero(joint_count: usize) -> Self {
        Self {
            joints: vec![0.0; joint_count],
            base: None,
        }
    }
}

/// Composes the displayed quaternion: `normalize(base * residual)`. The
/// product of two unit quaternions drifts from unit norm under floating
/// point, so the result is renormalized after every multiply.
pub fn compose_rotation(
    base: &UnitQuaternion<f64>,
    residual: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(base.into_inner() * residual.into_inner())
}

/// The exact algebraic inverse of [`compose_rotation`]:
/// `residual = normalize(base⁻¹ * displayed)`.
pub fn extract_rotation(
    base: &UnitQuaternion<f64>,
    displayed: &UnitQuaternion<f64>,
) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(base.inverse().into_inner() * displayed.into_inner())
}

/// SLERP that first brings both quaternions into the same hemisphere (the
/// dot product of their coordinates must not be negative), so interpolation
/// always takes the short way around.
pub fn slerp_aligned(
    a: &UnitQuaternion<f64>,
    b: &UnitQuaternion<f64>,
    t: f64,
) -> UnitQuaternion<f64> {
    let b = if a.coords.dot(&b.coords) < 0.0 {
        UnitQuaternion::new_normalize(-b.into_inner())
    } else {
        *b
    };
    match a.try_slerp(&b, t, 1e-9) {
        Some(q) => q,
        // Antipodal even after alignment: any great circle is as good as
        // another, snap to the nearer endpoint.
        None => if t < 0.5 { *a } else { b },
    }
}

/// Component-wise linear interpolation of joint vectors.
pub fn lerp_joints(start: &[f64], end: &[f64], t: f64) -> Vec<f64> {
    start
        .iter()
        .zip(end.iter())
        .map(|(s, e)| s + t * (e - s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_compose_extract_are_inverses() {
        let base = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.3);
        let displayed = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 1.1);
        let residual = extract_rotation(&base, &displayed);
        let recomposed = compose_rotation(&base, &residual);
        assert!(recomposed.angle_to(&displayed) < 1e-10);
    }

    #[test]
    fn test_composition_is_multiplicative_and_unit() {
        let base = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 0.7);
        let residual = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let combined = compose_rotation(&base, &residual);
        assert!((combined.norm() - 1.0).abs() < 1e-4);
        // Must equal normalize(base * residual), never a component-wise sum.
        let expected = UnitQuaternion::new_normalize(base.into_inner() * residual.into_inner());
        assert!(combined.angle_to(&expected) < 1e-12);
    }

    #[test]
    fn test_slerp_midpoint_of_quarter_turn() {
        let a = UnitQuaternion::identity();
        let b = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        let mid = slerp_aligned(&a, &b, 0.5);
        assert!((mid.norm() - 1.0).abs() < 1e-10, "midpoint must stay unit");
        assert!((mid.angle() - FRAC_PI_4).abs() < 1e-10, "midpoint must be a 45 degree turn");
    }

    #[test]
    fn test_slerp_takes_short_way_for_flipped_operand() {
        let a = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2);
        let b_short = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.4);
        // Same rotation, opposite sign of every component.
        let b_flipped = UnitQuaternion::new_normalize(-b_short.into_inner());
        let mid = slerp_aligned(&a, &b_flipped, 0.5);
        assert!((mid.angle() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_encode_identity_for_equal_poses() {
        let pose = crate::trajectory::Pose::from_parts(
            nalgebra::Translation3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.5),
        );
        let residual = BaseResidual::encode(&pose, &pose);
        assert!(residual.position.norm() < 1e-12);
        assert!(residual.rotation.angle() < 1e-10);
    }
}
