//! The trajectory editor: owns the base trajectory and the keyframe store,
//! composes displayed states from base plus interpolated residual, and hosts
//! every mutation of the residual set. No other component holds a second
//! authoritative copy of this state; analysis and solvers receive read-only
//! views or call back into the mutation API here.

use crate::edit_error::EditError;
use crate::keyframes::{Keyframe, KeyframeStore};
use crate::residual::{
    compose_rotation, extract_rotation, lerp_joints, slerp_aligned, BaseResidual, Residual,
};
use crate::scheduler::EditGuard;
use crate::trajectory::{to_csv_row, BaseTrajectory, Frame, Pose};
use nalgebra::Translation3;
use tracing::debug;

/// Frames per second assumed when a project does not say otherwise.
pub const DEFAULT_FPS: f64 = 50.0;

/// What [`TrajectoryEditor::export_csv`] emits: the composed states the user
/// sees, or the untouched base trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    Combined,
    Base,
}

/// The state actually displayed or exported for one frame: base plus the
/// interpolated residual.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedState {
    pub base: Pose,
    pub joints: Vec<f64>,
}

/// Owns the base trajectory, the keyframe residuals and the editing life
/// cycle. Queries are bounds checked and return `None` out of range;
/// mutations validate their preconditions before touching any state.
pub struct TrajectoryEditor {
    base: BaseTrajectory,
    keyframes: KeyframeStore,
    guard: EditGuard,
    pub fps: f64,
    pub original_file_name: Option<String>,
}

impl TrajectoryEditor {
    pub fn new(base: BaseTrajectory) -> Self {
        Self {
            base,
            keyframes: KeyframeStore::new(),
            guard: EditGuard::new(),
            fps: DEFAULT_FPS,
            original_file_name: None,
        }
    }

    /// Parse a CSV trajectory and build an editor around it. A parse that
    /// yields no frames still succeeds (empty editor), matching the soft
    /// failure of the parser itself.
    pub fn from_csv(text: &str) -> Self {
        Self::new(BaseTrajectory::parse_csv(text))
    }

    /// Replace the base trajectory wholesale. All keyframes are dropped, they
    /// were authored against the old base.
    pub fn load(&mut self, base: BaseTrajectory) {
        self.base = base;
        self.keyframes.clear();
    }

    /// Drop the trajectory and every keyframe.
    pub fn reset(&mut self) {
        self.base = BaseTrajectory::default();
        self.keyframes.clear();
    }

    pub fn base_trajectory(&self) -> &BaseTrajectory {
        &self.base
    }

    pub fn keyframes(&self) -> &KeyframeStore {
        &self.keyframes
    }

    pub fn frame_count(&self) -> usize {
        self.base.frame_count()
    }

    pub fn joint_count(&self) -> usize {
        self.base.joint_count()
    }

    // ---- Queries ----

    /// The untouched base state; `None` out of range.
    pub fn base_state(&self, frame: usize) -> Option<&Frame> {
        self.base.get(frame)
    }

    /// Interpolated joint residual at any frame (zero where editing does not
    /// apply).
    pub fn joint_residual(&self, frame: usize) -> Vec<f64> {
        self.keyframes.joint_residual_at(frame, self.base.joint_count())
    }

    /// Interpolated base residual, or `None` where no keyframe carries one.
    pub fn base_residual(&self, frame: usize) -> Option<BaseResidual> {
        self.keyframes.base_residual_at(frame)
    }

    /// Base plus interpolated residual: joints and position are added, the
    /// orientation residual is composed by multiplication and renormalized.
    /// `None` when the frame has no base state.
    pub fn combined_state(&self, frame: usize) -> Option<CombinedState> {
        let base = self.base.get(frame)?;
        let residual = self.joint_residual(frame);
        let joints = base
            .joints
            .iter()
            .zip(residual.iter())
            .map(|(b, r)| b + r)
            .collect();

        let pose = match self.base_residual(frame) {
            Some(base_residual) => Pose::from_parts(
                Translation3::from(base.base.translation.vector + base_residual.position),
                compose_rotation(&base.base.rotation, &base_residual.rotation),
            ),
            None => base.base,
        };

        Some(CombinedState { base: pose, joints })
    }

    // ---- Mutations ----

    /// Store a keyframe at `frame` whose composed state reproduces the given
    /// values: `residual = value - base` for joints and position, and
    /// `base⁻¹ * displayed` for the rotation. Overwrites an existing keyframe
    /// at the same index. Returns whether the index was previously absent.
    pub fn add_keyframe(
        &mut self,
        frame: usize,
        joint_values: &[f64],
        base_value: Option<&Pose>,
    ) -> Result<bool, EditError> {
        let keyframe = self.encode_keyframe(frame, joint_values, base_value)?;
        Ok(self.keyframes.insert(frame, keyframe))
    }

    /// Delete the keyframe; the interpolation segments of the remaining set
    /// recompute naturally. Removing a frame that has no keyframe is a no-op.
    pub fn remove_keyframe(&mut self, frame: usize) {
        self.keyframes.remove(frame);
    }

    /// Write-back of a live edit: if `frame` currently is a keyframe, its
    /// residual is unconditionally re-encoded from the edited values. Guarded
    /// against re-entry; a suppressed write returns `Ok(false)` (the edit is
    /// simply not recorded, it is not an error). Returns `Ok(true)` when the
    /// keyframe was updated, `Ok(false)` when the frame is not a keyframe.
    pub fn live_edit(
        &mut self,
        frame: usize,
        joint_values: &[f64],
        base_value: Option<&Pose>,
    ) -> Result<bool, EditError> {
        if !self.keyframes.contains(frame) {
            return Ok(false);
        }
        let keyframe = self.encode_keyframe(frame, joint_values, base_value)?;
        let Some(_scope) = self.guard.enter() else {
            debug!("Edit write-back suppressed, another write is in flight");
            return Ok(false);
        };
        self.keyframes.insert(frame, keyframe);
        Ok(true)
    }

    fn encode_keyframe(
        &self,
        frame: usize,
        joint_values: &[f64],
        base_value: Option<&Pose>,
    ) -> Result<Keyframe, EditError> {
        if self.base.is_empty() {
            return Err(EditError::NoTrajectory);
        }
        let base = self.base.get(frame).ok_or(EditError::FrameOutOfRange {
            frame,
            frame_count: self.base.frame_count(),
        })?;
        if joint_values.len() != base.joints.len() {
            return Err(EditError::JointCountMismatch {
                expected: base.joints.len(),
                found: joint_values.len(),
            });
        }

        let joints = joint_values
            .iter()
            .zip(base.joints.iter())
            .map(|(value, base)| value - base)
            .collect();
        let base_residual = base_value.map(|displayed| BaseResidual::encode(&base.base, displayed));

        Ok(Keyframe {
            residual: Residual { joints, base: base_residual },
            base_snapshot: Some(base.clone()),
        })
    }

    /// Recompute the residuals of the interior keyframes of a contiguous
    /// selection so that their composed states lie on the linear (joints,
    /// position) / SLERP (rotation) path between the composed states of the
    /// two endpoint keyframes. Endpoints are never modified. The whole
    /// operation is rejected before any mutation if fewer than 3 keyframes
    /// are selected, a selected frame is not a keyframe, or an unselected
    /// keyframe lies strictly inside the selection.
    pub fn smooth_range(&mut self, selection: &[usize]) -> Result<(), EditError> {
        if selection.len() < 3 {
            return Err(EditError::SelectionTooSmall { selected: selection.len() });
        }
        let mut selected: Vec<usize> = selection.to_vec();
        selected.sort_unstable();
        selected.dedup();
        for &frame in &selected {
            if !self.keyframes.contains(frame) {
                return Err(EditError::NotAKeyframe { frame });
            }
        }
        let first = selected[0];
        let last = *selected.last().expect("selection verified non-empty");
        for stored in self.keyframes.sorted_indices() {
            if stored > first && stored < last && !selected.contains(&stored) {
                return Err(EditError::SelectionNotContiguous { skipped_frame: stored });
            }
        }

        let first_state = self
            .combined_state(first)
            .ok_or(EditError::FrameOutOfRange { frame: first, frame_count: self.frame_count() })?;
        let last_state = self
            .combined_state(last)
            .ok_or(EditError::FrameOutOfRange { frame: last, frame_count: self.frame_count() })?;

        // Base overlays are smoothed only when the selection already edits the
        // base pose somewhere; otherwise a base residual would be invented for
        // keyframes the user only ever edited joints on.
        let smooth_base = selected
            .iter()
            .any(|&f| self.keyframes.get(f).is_some_and(|k| k.residual.base.is_some()));

        // All overlays are computed before anything is written, so a failure
        // above cannot leave the selection half-smoothed.
        let mut updates: Vec<(usize, Residual)> = Vec::with_capacity(selected.len() - 2);
        for &frame in &selected[1..selected.len() - 1] {
            let t = (frame - first) as f64 / (last - first) as f64;
            let base = self
                .base
                .get(frame)
                .ok_or(EditError::FrameOutOfRange { frame, frame_count: self.frame_count() })?;

            let overlay_joints = lerp_joints(&first_state.joints, &last_state.joints, t);
            let joints = overlay_joints
                .iter()
                .zip(base.joints.iter())
                .map(|(overlay, base)| overlay - base)
                .collect();

            let base_residual = if smooth_base {
                let overlay_position = first_state
                    .base
                    .translation
                    .vector
                    .lerp(&last_state.base.translation.vector, t);
                let overlay_rotation =
                    slerp_aligned(&first_state.base.rotation, &last_state.base.rotation, t);
                Some(BaseResidual {
                    position: overlay_position - base.base.translation.vector,
                    rotation: extract_rotation(&base.base.rotation, &overlay_rotation),
                })
            } else {
                None
            };

            updates.push((frame, Residual { joints, base: base_residual }));
        }

        for (frame, residual) in updates {
            if let Some(keyframe) = self.keyframes.get_mut(frame) {
                keyframe.residual = residual;
            }
        }
        Ok(())
    }

    /// Accumulate an incremental base correction into the keyframe at
    /// `frame`, creating a zero residual keyframe first if none exists. The
    /// position delta is summed; the rotation delta is left-multiplied onto
    /// the stored residual, preserving the order the composition step
    /// decodes.
    pub fn accumulate_base_residual(
        &mut self,
        frame: usize,
        delta: &BaseResidual,
    ) -> Result<(), EditError> {
        if self.base.get(frame).is_none() {
            return Err(EditError::FrameOutOfRange {
                frame,
                frame_count: self.base.frame_count(),
            });
        }
        if !self.keyframes.contains(frame) {
            let joint_count = self.base.joint_count();
            self.keyframes.insert(
                frame,
                Keyframe {
                    residual: Residual::zero(joint_count),
                    base_snapshot: self.base.get(frame).cloned(),
                },
            );
        }
        let keyframe = self
            .keyframes
            .get_mut(frame)
            .expect("keyframe just ensured");
        let old = keyframe
            .residual
            .base
            .take()
            .unwrap_or_else(BaseResidual::identity);
        keyframe.residual.base = Some(BaseResidual {
            position: old.position + delta.position,
            rotation: compose_rotation(&delta.rotation, &old.rotation),
        });
        Ok(())
    }

    // ---- Export ----

    /// Emit the trajectory as CSV, one row per frame in frame order, in the
    /// same column layout the importer reads. `Combined` applies the
    /// interpolated residuals; `Base` emits the untouched base trajectory.
    pub fn export_csv(&self, mode: ExportMode) -> String {
        let mut out = String::new();
        for frame in 0..self.base.frame_count() {
            let row = match mode {
                ExportMode::Base => {
                    let state = self.base.get(frame).expect("frame index within count");
                    to_csv_row(&state.base, &state.joints)
                }
                ExportMode::Combined => {
                    let state = self.combined_state(frame).expect("frame index within count");
                    to_csv_row(&state.base, &state.joints)
                }
            };
            out.push_str(&row);
            out.push('\n');
        }
        out
    }

    // ---- Project restore support ----

    /// Restore a keyframe with an already-encoded residual (project load).
    /// The residual is stored as-is; joints are sized to the trajectory's
    /// joint count by the caller.
    pub(crate) fn restore_keyframe(&mut self, frame: usize, residual: Residual) {
        self.keyframes.insert(
            frame,
            Keyframe {
                base_snapshot: self.base.get(frame).cloned(),
                residual,
            },
        );
    }
}
