//! The base trajectory: the original, unedited per-frame sequence of robot base
//! pose and joint angles. Immutable once loaded; all user corrections live in
//! keyframe residuals layered on top of it.
//!
//! The trajectory is exchanged as CSV, one frame per line:
//! `x,y,z,qx,qy,qz,qw,j0,...,jN-1`. Lines starting with `#` and empty lines
//! are ignored. The joint count is fixed by the first valid row.

use nalgebra::{Isometry3, Quaternion, Translation3, Unit, UnitQuaternion};
use tracing::warn;

/// Pose of the robot base: Cartesian position and rotation quaternion.
/// ```
/// extern crate nalgebra as na;
/// use na::{Isometry3, Translation3, UnitQuaternion};
///
/// type Pose = Isometry3<f64>;
///
/// let translation = Translation3::new(1.0, 0.0, 0.0);
/// // The quaternion should be normalized to represent a valid rotation.
/// let rotation = UnitQuaternion::from_quaternion(na::Quaternion::new(1.0, 0.0, 0.0, 1.0).normalize());
/// let pose = Pose::from_parts(translation, rotation);
/// ```
pub type Pose = Isometry3<f64>;

/// One sampled instant of the base trajectory: base pose plus the joint vector.
/// The joint ordering matches the order the non-fixed joints were extracted
/// from the robot description.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub base: Pose,
    pub joints: Vec<f64>,
}

/// Ordered sequence of frames. Every frame carries exactly `joint_count`
/// joint values; the count is fixed when the trajectory is created and rows
/// are assumed consistent thereafter.
#[derive(Debug, Clone, Default)]
pub struct BaseTrajectory {
    frames: Vec<Frame>,
    joint_count: usize,
}

impl BaseTrajectory {
    /// Create directly from frames. The joint count is taken from the first
    /// frame; an empty input yields an empty trajectory.
    pub fn new(frames: Vec<Frame>) -> Self {
        let joint_count = frames.first().map_or(0, |f| f.joints.len());
        Self { frames, joint_count }
    }

    /// Parse a CSV trajectory. Malformed rows (fewer than 7 fields, or fields
    /// that do not parse as floats) are skipped with a warning, they are never
    /// fatal. If no row is valid the result is simply an empty trajectory.
    pub fn parse_csv(text: &str) -> Self {
        let mut frames: Vec<Frame> = Vec::new();
        let mut joint_count: Option<usize> = None;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_row(line) {
                Ok(frame) => {
                    // The first valid row fixes the joint count.
                    let expected = *joint_count.get_or_insert(frame.joints.len());
                    if frame.joints.len() != expected {
                        warn!(
                            "Line {}: expected {} joints, found {}, row skipped",
                            line_no + 1, expected, frame.joints.len()
                        );
                        continue;
                    }
                    frames.push(frame);
                }
                Err(reason) => {
                    warn!("Line {}: {}, row skipped", line_no + 1, reason);
                }
            }
        }

        Self { frames, joint_count: joint_count.unwrap_or(0) }
    }

    /// Bounds checked access. Out of range frames are `None`, not a panic,
    /// callers are expected to null-check.
    pub fn get(&self, frame: usize) -> Option<&Frame> {
        self.frames.get(frame)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joint_count
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }
}

fn parse_row(line: &str) -> Result<Frame, String> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() < 7 {
        return Err(format!("expected at least 7 fields, found {}", fields.len()));
    }

    let mut values = Vec::with_capacity(fields.len());
    for field in &fields {
        match field.parse::<f64>() {
            Ok(v) => values.push(v),
            Err(_) => return Err(format!("'{}' is not a number", field)),
        }
    }

    let translation = Translation3::new(values[0], values[1], values[2]);
    // CSV carries the quaternion as qx, qy, qz, qw; nalgebra wants w first.
    let rotation = unit_quaternion(values[3], values[4], values[5], values[6]);
    Ok(Frame {
        base: Pose::from_parts(translation, rotation),
        joints: values[7..].to_vec(),
    })
}

/// Builds a unit quaternion from xyzw components, substituting identity for a
/// zero length input rather than letting NaN propagate.
pub fn unit_quaternion(x: f64, y: f64, z: f64, w: f64) -> UnitQuaternion<f64> {
    match Unit::try_new(Quaternion::new(w, x, y, z), 1e-9) {
        Some(q) => q,
        None => {
            warn!("Zero length quaternion ({}, {}, {}, {}), substituting identity", x, y, z, w);
            UnitQuaternion::identity()
        }
    }
}

/// Formats one frame as a CSV row in the same column layout the parser reads.
pub fn to_csv_row(base: &Pose, joints: &[f64]) -> String {
    let t = base.translation.vector;
    let q = base.rotation;
    let mut row = format!("{},{},{},{},{},{},{}", t.x, t.y, t.z, q.i, q.j, q.k, q.w);
    for joint in joints {
        row.push(',');
        row.push_str(&joint.to_string());
    }
    row
}
