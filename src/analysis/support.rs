//! Center of mass and ground footprint of a posed body. The results are
//! packaged into an immutable [`SupportAnalysis`] snapshot that the balance
//! solver consumes by value, so a recompute can never be observed half-way
//! through a solve.

use crate::hull::{convex_hull, polygon_centroid, principal_axes_2d, PrincipalAxis};
use crate::body::PosedBody;
use nalgebra::{Point2, Point3};
use parry3d::bounding_volume::{Aabb, BoundingVolume};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Above this many projected points the set is thinned on a grid before the
/// hull is computed, to bound the cost on dense meshes.
const DEDUP_POINT_CAP: usize = 500;

/// Cell size of the thinning grid, in meters.
const DEDUP_CELL_SIZE: f64 = 0.05;

/// Snapshot of one footprint/COM analysis. Recomputed on demand and replaced
/// wholesale; consumers hold their own copy.
#[derive(Debug, Clone)]
pub struct SupportAnalysis {
    /// Ground projected convex hull, counter-clockwise, no closing duplicate.
    pub hull: Vec<Point2<f64>>,
    /// Centroid of the hull polygon.
    pub centroid: Point2<f64>,
    /// Principal axes of the hull point distribution, major first.
    pub axes: [PrincipalAxis; 2],
    /// World center of mass of the posed body.
    pub com: Point3<f64>,
}

/// Mass weighted center of mass over all links. Links without mass are
/// skipped. A body with no mass data at all falls back to the geometric
/// center of its bounding box (an approximation, logged as such); `None`
/// only when there is neither mass nor geometry to fall back to.
pub fn center_of_mass(body: &impl PosedBody) -> Option<Point3<f64>> {
    let mut total_mass = 0.0;
    let mut weighted = nalgebra::Vector3::zeros();

    for index in 0..body.link_count() {
        let link = body.link(index);
        let Some(mass) = link.mass else { continue };
        if mass <= 0.0 {
            continue;
        }
        let offset = link.inertial_offset.unwrap_or_else(nalgebra::Vector3::zeros);
        let world = link.world_pose.transform_point(&Point3::from(offset));
        weighted += world.coords * mass;
        total_mass += mass;
    }

    if total_mass > 0.0 {
        return Some(Point3::from(weighted / total_mass));
    }

    // Incomplete model description: no masses anywhere. The bounding box
    // center of the whole body stands in for the center of mass.
    let aabb = body_aabb(body)?;
    warn!("Body has no mass data, using bounding box center as center of mass");
    let center = aabb.center();
    Some(Point3::new(center.x as f64, center.y as f64, center.z as f64))
}

fn body_aabb(body: &impl PosedBody) -> Option<Aabb> {
    let mut overall = Aabb::new_invalid();
    let mut any = false;
    for index in 0..body.link_count() {
        let link = body.link(index);
        let Some(vertices) = link.vertices else { continue };
        if vertices.is_empty() {
            continue;
        }
        let pose = link.world_pose.cast::<f32>();
        let world: Vec<Point3<f32>> =
            vertices.iter().map(|v| pose.transform_point(v)).collect();
        overall.merge(&Aabb::from_points(world.iter().copied()));
        any = true;
    }
    if any { Some(overall) } else { None }
}

/// Ground footprint: all mesh vertices of links whose world height is below
/// `height_threshold`, projected onto the ground plane and wrapped in their
/// convex hull. `None` when nothing lies below the threshold.
pub fn footprint(body: &impl PosedBody, height_threshold: f64) -> Option<Vec<Point2<f64>>> {
    let mut projected: Vec<Point2<f64>> = Vec::new();
    for index in 0..body.link_count() {
        let link = body.link(index);
        if link.world_pose.translation.vector.z >= height_threshold {
            continue;
        }
        let Some(vertices) = link.vertices else { continue };
        let pose = link.world_pose.cast::<f32>();
        for vertex in vertices {
            let world = pose.transform_point(vertex);
            projected.push(Point2::new(world.x as f64, world.y as f64));
        }
    }
    if projected.is_empty() {
        return None;
    }

    if projected.len() > DEDUP_POINT_CAP {
        let was = projected.len();
        projected = grid_thin(&projected, DEDUP_CELL_SIZE);
        debug!("Thinned footprint points from {} to {}", was, projected.len());
    }

    Some(convex_hull(&projected))
}

/// One representative point per grid cell.
fn grid_thin(points: &[Point2<f64>], cell: f64) -> Vec<Point2<f64>> {
    let mut cells: HashMap<(i64, i64), Point2<f64>> = HashMap::new();
    for point in points {
        let key = ((point.x / cell).floor() as i64, (point.y / cell).floor() as i64);
        cells.entry(key).or_insert(*point);
    }
    cells.into_values().collect()
}

/// Full analysis: COM plus footprint hull, centroid and principal axes.
/// `None` when either half cannot be computed (no geometry below the
/// threshold, or a body with neither mass nor geometry).
pub fn analyze(body: &impl PosedBody, height_threshold: f64) -> Option<SupportAnalysis> {
    let com = center_of_mass(body)?;
    let hull = footprint(body, height_threshold)?;
    let centroid = polygon_centroid(&hull)?;
    let axes = principal_axes_2d(&hull, &centroid)?;
    Some(SupportAnalysis { hull, centroid, axes, com })
}

/// Display lengths for the two principal axes: 2·√variance (about two
/// standard deviations), with the major axis stretched to keep at least a
/// 1.5 ratio over the minor when the distribution is nearly isotropic. This
/// is purely a presentation aid for axis visualisation; it never feeds back
/// into the analysis.
pub fn axis_display_lengths(axes: &[PrincipalAxis; 2]) -> [f64; 2] {
    let major = 2.0 * axes[0].variance.max(0.0).sqrt();
    let minor = 2.0 * axes[1].variance.max(0.0).sqrt();
    if minor > 0.0 && major / minor < 1.5 {
        [1.5 * minor, minor]
    } else {
        [major, minor]
    }
}
