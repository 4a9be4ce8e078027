//! 2D computational geometry for the footprint analysis: convex hull,
//! polygon centroid and principal axes. Pure functions over point sets.

use nalgebra::{Point2, Vector2};

/// Convex hull by Graham scan. The pivot is the lowest-y point (ties broken
/// by lowest x); the remaining points are sorted by polar angle around it,
/// equal angles ordered farther-first; the sweep pops while the last three
/// points do not turn strictly counter-clockwise. The result is CCW without
/// a duplicate closing point. Fewer than 3 distinct points are returned
/// as-is.
pub fn convex_hull(points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let pivot = *points
        .iter()
        .min_by(|a, b| {
            (a.y, a.x)
                .partial_cmp(&(b.y, b.x))
                .expect("footprint points must be finite")
        })
        .expect("non-empty checked above");

    let mut rest: Vec<Point2<f64>> = points
        .iter()
        .copied()
        .filter(|p| (p - pivot).norm_squared() > 0.0)
        .collect();
    rest.sort_by(|a, b| {
        let angle_a = (a.y - pivot.y).atan2(a.x - pivot.x);
        let angle_b = (b.y - pivot.y).atan2(b.x - pivot.x);
        angle_a
            .partial_cmp(&angle_b)
            .expect("angles of finite points are comparable")
            // Equal angle: farther point first so the nearer duplicates are
            // popped by the sweep.
            .then_with(|| {
                let dist_a = (a - pivot).norm_squared();
                let dist_b = (b - pivot).norm_squared();
                dist_b.partial_cmp(&dist_a).expect("finite distances")
            })
    });

    let mut stack: Vec<Point2<f64>> = vec![pivot];
    for point in rest {
        while stack.len() >= 2 {
            let last = stack[stack.len() - 1];
            let second = stack[stack.len() - 2];
            if cross(&(last - second), &(point - last)) > 0.0 {
                break;
            }
            stack.pop();
        }
        stack.push(point);
    }
    stack
}

/// Centroid of a polygon given by its vertices in order. For 3 or more
/// points the signed-area weighted formula is used; 2 points give the
/// midpoint, 1 point gives itself. A degenerate polygon (near-zero signed
/// area, all points collinear) falls back to the arithmetic mean.
pub fn polygon_centroid(points: &[Point2<f64>]) -> Option<Point2<f64>> {
    match points.len() {
        0 => return None,
        1 => return Some(points[0]),
        2 => return Some(Point2::from((points[0].coords + points[1].coords) / 2.0)),
        _ => {}
    }

    let mut signed_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        let cross = p.x * q.y - q.x * p.y;
        signed_area += cross;
        cx += (p.x + q.x) * cross;
        cy += (p.y + q.y) * cross;
    }
    signed_area *= 0.5;

    if signed_area.abs() < 1e-12 {
        // Collinear points enclose no area; the mean is the best stand-in.
        let mean = points.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords)
            / points.len() as f64;
        return Some(Point2::from(mean));
    }
    Some(Point2::new(cx / (6.0 * signed_area), cy / (6.0 * signed_area)))
}

/// One principal direction of a 2D point distribution.
#[derive(Debug, Clone, Copy)]
pub struct PrincipalAxis {
    pub direction: Vector2<f64>,
    pub variance: f64,
}

/// Principal component analysis of 2D points relative to `center`. The 2x2
/// covariance matrix has closed-form eigenvalues from the trace/determinant
/// quadratic; the major eigenvector comes directly from the matrix entries
/// with an axis-aligned fallback when the off-diagonal covariance vanishes.
/// The minor axis is the perpendicular of the major, orthogonal by
/// construction. Returns `[major, minor]`, eigenvalues descending.
pub fn principal_axes_2d(points: &[Point2<f64>], center: &Point2<f64>) -> Option<[PrincipalAxis; 2]> {
    if points.is_empty() {
        return None;
    }

    let n = points.len() as f64;
    let mut xx = 0.0;
    let mut xy = 0.0;
    let mut yy = 0.0;
    for p in points {
        let dx = p.x - center.x;
        let dy = p.y - center.y;
        xx += dx * dx;
        xy += dx * dy;
        yy += dy * dy;
    }
    xx /= n;
    xy /= n;
    yy /= n;

    let trace = xx + yy;
    let det = xx * yy - xy * xy;
    let half_trace = trace / 2.0;
    let discriminant = (half_trace * half_trace - det).max(0.0).sqrt();
    let lambda_major = half_trace + discriminant;
    let lambda_minor = half_trace - discriminant;

    let major = if xy.abs() > 1e-12 {
        Vector2::new(lambda_major - yy, xy).normalize()
    } else if xx >= yy {
        Vector2::x()
    } else {
        Vector2::y()
    };
    let minor = Vector2::new(-major.y, major.x);

    Some([
        PrincipalAxis { direction: major, variance: lambda_major },
        PrincipalAxis { direction: minor, variance: lambda_minor },
    ])
}

fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}
