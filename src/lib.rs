//! Residual based editing of robot motion trajectories.
//!
//! A motion trajectory arrives as an immutable base: one frame per sample,
//! each carrying the base pose of the robot and its joint angles. Edits never
//! touch the base. Instead the user authors sparse keyframes holding
//! *residuals*: additive offsets for joints and position, a compositional
//! quaternion for orientation (`displayed = base * residual`). Residuals are
//! interpolated over the timeline (linear for joints and position, SLERP for
//! orientation) and composed with the base to produce the state that is
//! displayed and exported.
//!
//! # Features
//!
//! - Tolerant CSV import and combined/base CSV export of trajectories.
//! - Keyframe authoring with exact round trips: adding a keyframe from edited
//!   values and reading the combined state back reproduces those values.
//! - Defined interpolation boundary policy: frames before the first keyframe
//!   stay untouched, frames after the last hold its correction.
//! - Range smoothing that re-derives interior keyframe residuals from the
//!   interpolated overlay of the selection endpoints.
//! - JSON project files with defensive loading of corrupt or legacy entries.
//! - Support polygon analysis: center of mass, ground footprint convex hull,
//!   centroid and principal axes of a posed body.
//! - A balance solver that turns the analysis into a clamped corrective
//!   rotation and accumulates it back into the keyframe residuals.
//!
//! The editing model is strictly single threaded and event driven; see
//! [`scheduler`] for the debouncing and re-entrancy primitives the host
//! event loop drives.

pub mod edit_error;
pub mod trajectory;
pub mod residual;
pub mod keyframes;
pub mod editor;
pub mod scheduler;

pub mod utils;

#[cfg(feature = "allow_filesystem")]
pub mod project;

#[cfg(feature = "support_analysis")]
pub mod body;

#[cfg(feature = "support_analysis")]
#[path = "analysis/hull.rs"]
pub mod hull;

#[cfg(feature = "support_analysis")]
#[path = "analysis/support.rs"]
pub mod support;

#[cfg(feature = "support_analysis")]
#[path = "analysis/balance.rs"]
pub mod balance;

#[cfg(test)]
mod tests;
