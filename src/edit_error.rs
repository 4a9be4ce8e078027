//! Error handling for trajectory editing operations

use std::io;

/// Unified error to report failures of editing operations and project file handling.
/// Query functions never produce this error (they return `None` for out of range
/// frames); mutation functions reject invalid preconditions with it before
/// touching any state.
#[derive(Debug)]
pub enum EditError {
    IoError(io::Error),
    /// No base trajectory is loaded, the operation has nothing to edit.
    NoTrajectory,
    FrameOutOfRange { frame: usize, frame_count: usize },
    JointCountMismatch { expected: usize, found: usize },
    /// Smoothing needs at least 3 selected keyframes.
    SelectionTooSmall { selected: usize },
    /// An unselected keyframe lies strictly between two selected ones.
    SelectionNotContiguous { skipped_frame: usize },
    /// A selected frame carries no keyframe.
    NotAKeyframe { frame: usize },
    ParseError(String),
}

impl std::fmt::Display for EditError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            EditError::IoError(ref err) =>
                write!(f, "IO Error: {}", err),
            EditError::NoTrajectory =>
                write!(f, "No base trajectory is loaded"),
            EditError::FrameOutOfRange { frame, frame_count } =>
                write!(f, "Frame {} out of range, trajectory has {} frames", frame, frame_count),
            EditError::JointCountMismatch { expected, found } =>
                write!(f, "Joint count mismatch: expected {}, found {}", expected, found),
            EditError::SelectionTooSmall { selected } =>
                write!(f, "Smoothing needs at least 3 keyframes, {} selected", selected),
            EditError::SelectionNotContiguous { skipped_frame } =>
                write!(f, "Selection is not contiguous, keyframe at frame {} is not selected", skipped_frame),
            EditError::NotAKeyframe { frame } =>
                write!(f, "Frame {} carries no keyframe", frame),
            EditError::ParseError(ref msg) =>
                write!(f, "Parse Error: {}", msg),
        }
    }
}

impl std::error::Error for EditError {}

impl From<io::Error> for EditError {
    fn from(err: io::Error) -> Self {
        EditError::IoError(err)
    }
}
