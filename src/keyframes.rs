//! Sparse keyframe storage and residual interpolation.
//!
//! Keyframes live in a map from frame index to the authored residual; the
//! sorted index set partitions the timeline into interpolation segments.
//! The boundary policy: frames before the first keyframe are untouched
//! (zero/absent residual), frames after the last hold its value, frames
//! between two keyframes interpolate linearly (joints, position) or by
//! SLERP (rotation). A frame that is itself a keyframe returns its residual
//! exactly.

use crate::residual::{lerp_joints, slerp_aligned, BaseResidual, Residual};
use crate::trajectory::Frame;
use std::collections::HashMap;

/// A user-authored correction anchored at a specific frame index. The base
/// snapshot is the state the keyframe was authored against; it is cached for
/// inspection only and never read back by composition (the authoritative base
/// is always the trajectory itself).
#[derive(Debug, Clone)]
pub struct Keyframe {
    pub residual: Residual,
    pub base_snapshot: Option<Frame>,
}

/// Map of frame index to keyframe. Storage is unordered; consumers that need
/// order obtain the sorted index set. For the typical tens to low hundreds of
/// keyframes, re-sorting per query is cheap and keeps mutation trivial.
#[derive(Debug, Clone, Default)]
pub struct KeyframeStore {
    entries: HashMap<usize, Keyframe>,
}

impl KeyframeStore {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Insert or overwrite. Returns true when the index was previously absent
    /// (callers use this to decide whether timeline markers need a redraw).
    pub fn insert(&mut self, frame: usize, keyframe: Keyframe) -> bool {
        self.entries.insert(frame, keyframe).is_none()
    }

    pub fn remove(&mut self, frame: usize) -> Option<Keyframe> {
        self.entries.remove(&frame)
    }

    pub fn get(&self, frame: usize) -> Option<&Keyframe> {
        self.entries.get(&frame)
    }

    pub fn get_mut(&mut self, frame: usize) -> Option<&mut Keyframe> {
        self.entries.get_mut(&frame)
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.entries.contains_key(&frame)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keyframe indices in ascending order.
    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    /// Interpolated joint residual at any frame, per the boundary policy.
    /// `joint_count` shapes the zero vector returned where no keyframe
    /// applies.
    pub fn joint_residual_at(&self, frame: usize, joint_count: usize) -> Vec<f64> {
        match self.segment_at(frame) {
            Segment::Empty | Segment::Before => vec![0.0; joint_count],
            Segment::At(k) => self.entries[&k].residual.joints.clone(),
            Segment::After(last) => self.entries[&last].residual.joints.clone(),
            Segment::Between { prev, next, t } => lerp_joints(
                &self.entries[&prev].residual.joints,
                &self.entries[&next].residual.joints,
                t,
            ),
        }
    }

    /// Interpolated base residual at any frame, or `None` when editing has
    /// not touched the base pose at all (no keyframe anywhere carries one)
    /// or the frame precedes the first keyframe. A keyframe without a base
    /// residual counts as identity once any other keyframe has one, so the
    /// interpolation stays continuous across it.
    pub fn base_residual_at(&self, frame: usize) -> Option<BaseResidual> {
        if !self.any_base_residual() {
            return None;
        }
        match self.segment_at(frame) {
            Segment::Empty | Segment::Before => None,
            Segment::At(k) => Some(self.base_or_identity(k)),
            Segment::After(last) => Some(self.base_or_identity(last)),
            Segment::Between { prev, next, t } => {
                let a = self.base_or_identity(prev);
                let b = self.base_or_identity(next);
                Some(BaseResidual {
                    position: a.position.lerp(&b.position, t),
                    rotation: slerp_aligned(&a.rotation, &b.rotation, t),
                })
            }
        }
    }

    fn any_base_residual(&self) -> bool {
        self.entries.values().any(|k| k.residual.base.is_some())
    }

    fn base_or_identity(&self, frame: usize) -> BaseResidual {
        self.entries[&frame]
            .residual
            .base
            .clone()
            .unwrap_or_else(BaseResidual::identity)
    }

    /// Locates `frame` relative to the sorted keyframe set.
    fn segment_at(&self, frame: usize) -> Segment {
        let indices = self.sorted_indices();
        let (first, last) = match (indices.first(), indices.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Segment::Empty,
        };
        if self.entries.contains_key(&frame) {
            return Segment::At(frame);
        }
        if frame < first {
            return Segment::Before;
        }
        if frame > last {
            return Segment::After(last);
        }
        // partition_point: first index strictly greater than frame.
        let upper = indices.partition_point(|&k| k <= frame);
        let prev = indices[upper - 1];
        let next = indices[upper];
        let t = (frame - prev) as f64 / (next - prev) as f64;
        Segment::Between { prev, next, t }
    }
}

enum Segment {
    /// No keyframes at all.
    Empty,
    /// Before the first keyframe: residuals do not apply.
    Before,
    /// Exactly at a keyframe.
    At(usize),
    /// After the last keyframe, which holds (clamped, not extrapolated).
    After(usize),
    Between { prev: usize, next: usize, t: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::f64::consts::FRAC_PI_2;

    fn keyframe(joints: Vec<f64>, base: Option<BaseResidual>) -> Keyframe {
        Keyframe {
            residual: Residual { joints, base },
            base_snapshot: None,
        }
    }

    #[test]
    fn test_boundary_policy() {
        let mut store = KeyframeStore::new();
        store.insert(5, keyframe(vec![1.0, 2.0], None));
        store.insert(15, keyframe(vec![3.0, 6.0], None));

        // Before the first keyframe: zero.
        assert_eq!(store.joint_residual_at(0, 2), vec![0.0, 0.0]);
        // At a keyframe: exact.
        assert_eq!(store.joint_residual_at(5, 2), vec![1.0, 2.0]);
        // Midway: linear interpolation.
        assert_eq!(store.joint_residual_at(10, 2), vec![2.0, 4.0]);
        // Past the last keyframe: held, not extrapolated.
        assert_eq!(store.joint_residual_at(20, 2), vec![3.0, 6.0]);
    }

    #[test]
    fn test_no_keyframes_is_zero_and_none() {
        let store = KeyframeStore::new();
        assert_eq!(store.joint_residual_at(3, 4), vec![0.0; 4]);
        assert!(store.base_residual_at(3).is_none());
    }

    #[test]
    fn test_base_residual_none_when_nobody_has_one() {
        let mut store = KeyframeStore::new();
        store.insert(2, keyframe(vec![0.1], None));
        store.insert(8, keyframe(vec![0.4], None));
        assert!(store.base_residual_at(5).is_none());
    }

    #[test]
    fn test_missing_base_residual_interpolates_as_identity() {
        let mut store = KeyframeStore::new();
        let quarter_turn = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2);
        store.insert(
            0,
            keyframe(
                vec![0.0],
                Some(BaseResidual {
                    position: Vector3::new(2.0, 0.0, 0.0),
                    rotation: quarter_turn,
                }),
            ),
        );
        // No base residual here, but it must act as identity, not absence.
        store.insert(10, keyframe(vec![0.0], None));

        let mid = store.base_residual_at(5).expect("base residual applies");
        assert!((mid.position - Vector3::new(1.0, 0.0, 0.0)).norm() < 1e-12);
        assert!((mid.rotation.angle() - FRAC_PI_2 / 2.0).abs() < 1e-10);

        // Holding past the last keyframe holds its identity residual.
        let held = store.base_residual_at(20).expect("held residual applies");
        assert!(held.rotation.angle() < 1e-12);
        assert!(held.position.norm() < 1e-12);
    }

    #[test]
    fn test_slerp_between_rotation_residuals() {
        let mut store = KeyframeStore::new();
        store.insert(
            5,
            keyframe(vec![], Some(BaseResidual {
                position: Vector3::zeros(),
                rotation: UnitQuaternion::identity(),
            })),
        );
        store.insert(
            15,
            keyframe(vec![], Some(BaseResidual {
                position: Vector3::zeros(),
                rotation: UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
            })),
        );
        let mid = store.base_residual_at(10).unwrap();
        // Midpoint of a 90 degree residual is a unit 45 degree rotation.
        assert!((mid.rotation.norm() - 1.0).abs() < 1e-10);
        assert!((mid.rotation.angle() - FRAC_PI_2 / 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_remove_recomputes_segments() {
        let mut store = KeyframeStore::new();
        store.insert(0, keyframe(vec![0.0], None));
        store.insert(10, keyframe(vec![10.0], None));
        store.insert(20, keyframe(vec![0.0], None));
        assert_eq!(store.joint_residual_at(15, 1), vec![5.0]);
        store.remove(10);
        // The segment now spans 0..20 directly.
        assert_eq!(store.joint_residual_at(15, 1), vec![0.0]);
    }
}
