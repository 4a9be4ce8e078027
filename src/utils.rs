//! Helper functions

use crate::trajectory::Pose;
use nalgebra::UnitQuaternion;

/// Print joint values, converting radians to degrees.
#[allow(dead_code)]
pub fn dump_joints(joints: &[f64]) {
    let mut row_str = String::new();
    for joint in joints {
        row_str.push_str(&format!("{:5.2} ", joint.to_degrees()));
    }
    println!("[{}]", row_str.trim_end());
}

pub fn dump_pose(pose: &Pose) {
    // Extract translation components
    let translation = pose.translation.vector;

    // Extract rotation components
    let rotation: UnitQuaternion<f64> = pose.rotation;

    // Print translation and rotation
    println!(
        "x: {:.5}, y: {:.5}, z: {:.5},  quat: {:.5},{:.5},{:.5},{:.5}",
        translation.x, translation.y, translation.z, rotation.i, rotation.j, rotation.k, rotation.w
    );
}

/// Checks if all values in the joint vector are finite.
pub fn is_valid(joints: &[f64]) -> bool {
    joints.iter().all(|&q| q.is_finite())
}
