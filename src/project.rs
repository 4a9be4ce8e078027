//! Project files: the JSON interchange format that bundles the base
//! trajectory, the authored keyframes and the session metadata. Field names
//! are camelCase, the format is shared with editors written in other
//! languages.
//!
//! Loading is deliberately tolerant. Keyframe residuals of the wrong shape
//! are coerced to safe defaults instead of failing the whole file, and a
//! project written by an older major version loads with a warning (the
//! orientation residual semantics changed across major versions; old
//! projects may display wrong orientations and the user is told so rather
//! than the data being silently rewritten).

use crate::edit_error::EditError;
use crate::editor::{TrajectoryEditor, DEFAULT_FPS};
use crate::residual::{BaseResidual, Residual};
use crate::trajectory::{unit_quaternion, BaseTrajectory, Frame, Pose};
use nalgebra::{Translation3, Vector3};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Version written into new project files.
pub const PROJECT_VERSION: &str = "2.1";

const CURRENT_MAJOR: u32 = 2;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectFile {
    #[serde(default)]
    version: Option<String>,
    base_trajectory: Vec<FrameData>,
    keyframes: Vec<KeyframeData>,
    joint_count: usize,
    #[serde(default)]
    original_file_name: Option<String>,
    #[serde(default)]
    fps: Option<f64>,
}

/// One frame of the base trajectory. The quaternion is stored in
/// [x, y, z, w] ordering.
#[derive(Serialize, Deserialize)]
struct FrameData {
    position: [f64; 3],
    quaternion: [f64; 4],
    joints: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyframeData {
    frame_index: usize,
    residual: ResidualData,
}

/// Residual payload kept loose on purpose: corrupt and legacy files carry
/// joints that are not arrays and base residuals missing one of their parts,
/// and those must coerce, not abort the load.
#[derive(Serialize, Deserialize)]
struct ResidualData {
    #[serde(default)]
    joints: serde_json::Value,
    #[serde(default)]
    base: Option<BaseResidualData>,
}

#[derive(Serialize, Deserialize)]
struct BaseResidualData {
    #[serde(default)]
    position: Option<[f64; 3]>,
    #[serde(default)]
    quaternion: Option<[f64; 4]>,
}

/// Serialize the editor into the project JSON format.
pub fn save_project(editor: &TrajectoryEditor) -> String {
    let base_trajectory = editor
        .base_trajectory()
        .frames()
        .iter()
        .map(frame_data)
        .collect();

    let keyframes: Vec<KeyframeData> = editor
        .keyframes()
        .sorted_indices()
        .into_iter()
        .map(|frame_index| {
            let keyframe = editor.keyframes().get(frame_index).expect("index from the store");
            KeyframeData {
                frame_index,
                residual: ResidualData {
                    joints: serde_json::json!(keyframe.residual.joints),
                    base: keyframe.residual.base.as_ref().map(|base| BaseResidualData {
                        position: Some([base.position.x, base.position.y, base.position.z]),
                        quaternion: Some([
                            base.rotation.i,
                            base.rotation.j,
                            base.rotation.k,
                            base.rotation.w,
                        ]),
                    }),
                },
            }
        })
        .collect();

    let file = ProjectFile {
        version: Some(PROJECT_VERSION.to_string()),
        base_trajectory,
        keyframes,
        joint_count: editor.joint_count(),
        original_file_name: editor.original_file_name.clone(),
        fps: Some(editor.fps),
    };
    serde_json::to_string_pretty(&file).expect("project structs serialize infallibly")
}

/// Deserialize a project, rebuilding the editor. Corrupt keyframe entries
/// are coerced to safe defaults; a legacy version only warns.
pub fn load_project(json: &str) -> Result<TrajectoryEditor, EditError> {
    let file: ProjectFile =
        serde_json::from_str(json).map_err(|e| EditError::ParseError(format!("{}", e)))?;

    check_version(file.version.as_deref());

    let joint_count = file.joint_count;
    let frames: Vec<Frame> = file
        .base_trajectory
        .iter()
        .map(|data| Frame {
            base: pose_from(data.position, data.quaternion),
            joints: data.joints.clone(),
        })
        .collect();

    let mut editor = TrajectoryEditor::new(BaseTrajectory::new(frames));
    editor.fps = file.fps.unwrap_or(DEFAULT_FPS);
    editor.original_file_name = file.original_file_name;

    for entry in file.keyframes {
        let joints = coerce_joints(&entry.residual.joints, joint_count, entry.frame_index);
        let base = entry.residual.base.and_then(|base| coerce_base(base, entry.frame_index));
        editor.restore_keyframe(entry.frame_index, Residual { joints, base });
    }
    Ok(editor)
}

/// Read a project from disk.
pub fn load_project_file<P: AsRef<Path>>(path: P) -> Result<TrajectoryEditor, EditError> {
    let json = std::fs::read_to_string(path)?;
    load_project(&json)
}

/// Write a project to disk.
pub fn save_project_file<P: AsRef<Path>>(
    editor: &TrajectoryEditor,
    path: P,
) -> Result<(), EditError> {
    std::fs::write(path, save_project(editor))?;
    Ok(())
}

fn frame_data(frame: &Frame) -> FrameData {
    let t = frame.base.translation.vector;
    let q = frame.base.rotation;
    FrameData {
        position: [t.x, t.y, t.z],
        quaternion: [q.i, q.j, q.k, q.w],
        joints: frame.joints.clone(),
    }
}

fn pose_from(position: [f64; 3], quaternion: [f64; 4]) -> Pose {
    Pose::from_parts(
        Translation3::new(position[0], position[1], position[2]),
        unit_quaternion(quaternion[0], quaternion[1], quaternion[2], quaternion[3]),
    )
}

fn check_version(version: Option<&str>) {
    let Some(version) = version else {
        warn!(
            "Project has no version, treating as legacy; orientation residuals may be interpreted differently than the authoring editor did"
        );
        return;
    };
    let major = version
        .split('.')
        .next()
        .and_then(|m| m.parse::<u32>().ok());
    match major {
        Some(major) if major < CURRENT_MAJOR => warn!(
            "Project version {} predates {}; orientation residual semantics changed, loaded orientations may be wrong",
            version, PROJECT_VERSION
        ),
        Some(_) => {}
        None => warn!("Unparseable project version '{}', loading best-effort", version),
    }
}

/// A joints residual that is not an array of numbers, or is empty, becomes a
/// zero residual of the right length.
fn coerce_joints(value: &serde_json::Value, joint_count: usize, frame: usize) -> Vec<f64> {
    if let Some(items) = value.as_array() {
        let joints: Vec<f64> = items.iter().filter_map(|v| v.as_f64()).collect();
        if joints.len() == items.len() && !joints.is_empty() {
            return joints;
        }
    }
    warn!(
        "Keyframe at frame {} has a malformed joints residual, substituting zeros",
        frame
    );
    vec![0.0; joint_count]
}

/// A base residual missing either part is treated as absent rather than
/// half-populated.
fn coerce_base(data: BaseResidualData, frame: usize) -> Option<BaseResidual> {
    match (data.position, data.quaternion) {
        (Some(p), Some(q)) => Some(BaseResidual {
            position: Vector3::new(p[0], p[1], p[2]),
            rotation: unit_quaternion(q[0], q[1], q[2], q[3]),
        }),
        _ => {
            warn!(
                "Keyframe at frame {} has a partial base residual, treating as absent",
                frame
            );
            None
        }
    }
}
