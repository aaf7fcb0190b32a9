// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stateless 2D predicates with explicit tolerance.
//!
//! All functions take an absolute `eps`. Nothing in here keeps state, so the
//! predicates are safe to call from parallel per-face work.

use nalgebra::{Point2, Vector2};

use crate::error::{Error, Result};

/// Relationship between two 2D segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interposition {
    /// The segments do not touch.
    Disjoint,
    /// The segments touch or cross in a single point.
    Point(Point2<f64>),
    /// The segments overlap along a shared sub-segment.
    Segment(Point2<f64>, Point2<f64>),
    /// The segments lie on the same line but do not overlap.
    Collinear,
}

/// Location of a point relative to a closed polygon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointLocation {
    /// Coincides with the polygon vertex at this index.
    OnVertex(usize),
    /// Lies on the edge starting at this vertex index.
    OnEdge(usize),
    Inside,
    Outside,
}

#[inline]
fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

#[inline]
fn is_finite(p: &Point2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

/// Returns `true` if `p` lies on segment `a`–`b` within `eps`.
///
/// Uses the projection ratio along the segment plus the distance to the
/// projected point instead of a bare cross product, so long nearly collinear
/// segments do not drift out of tolerance.
pub fn point_on_segment(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>, eps: f64) -> bool {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= eps * eps {
        return (p - a).norm() <= eps;
    }
    let len = len_sq.sqrt();
    let t = (p - a).dot(&ab) / len_sq;
    let slack = eps / len;
    if t < -slack || t > 1.0 + slack {
        return false;
    }
    let projected = a + ab * t.clamp(0.0, 1.0);
    (p - projected).norm() <= eps
}

/// Projection parameter of `p` along `a`–`b` (0 at `a`, 1 at `b`).
#[inline]
pub fn projection_parameter(p: &Point2<f64>, a: &Point2<f64>, b: &Point2<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq == 0.0 {
        return 0.0;
    }
    (p - a).dot(&ab) / len_sq
}

/// Orders points lying on segment `a`–`b` from `a` towards `b`.
pub fn sort_points_on_edge(a: &Point2<f64>, b: &Point2<f64>, points: &mut [Point2<f64>]) {
    points.sort_by(|p, q| {
        projection_parameter(p, a, b).total_cmp(&projection_parameter(q, a, b))
    });
}

/// Classifies two segments `a0`–`a1` and `b0`–`b1`.
///
/// Endpoints lying on the other segment are returned verbatim so T-junctions
/// reuse the exact existing coordinate. An overlap whose two ends coincide
/// within `eps` is reported as a single point.
///
/// Fails with [`Error::InvalidQuery`] for zero-length input and with
/// [`Error::NotComputed`] for non-finite coordinates; callers must treat both
/// as fatal.
pub fn edges_interposition(
    a0: &Point2<f64>,
    a1: &Point2<f64>,
    b0: &Point2<f64>,
    b1: &Point2<f64>,
    eps: f64,
) -> Result<Interposition> {
    if !(is_finite(a0) && is_finite(a1) && is_finite(b0) && is_finite(b1)) {
        return Err(Error::NotComputed("non-finite segment coordinates".into()));
    }

    let da = a1 - a0;
    let db = b1 - b0;
    let len_a = da.norm();
    let len_b = db.norm();
    if len_a <= eps || len_b <= eps {
        return Err(Error::InvalidQuery(format!(
            "zero-length segment (|a| = {len_a:e}, |b| = {len_b:e})"
        )));
    }

    // Distances of b's endpoints from the carrier line of a.
    let off0 = cross(&da, &(b0 - a0)).abs() / len_a;
    let off1 = cross(&da, &(b1 - a0)).abs() / len_a;

    if off0 <= eps && off1 <= eps {
        let t0 = projection_parameter(b0, a0, a1);
        let t1 = projection_parameter(b1, a0, a1);
        let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
        let start = lo.max(0.0);
        let end = hi.min(1.0);
        let slack = eps / len_a;

        if end < start - slack {
            return Ok(Interposition::Collinear);
        }

        let p = pick_overlap_end(start, a0, a1, b0, b1, eps);
        let q = pick_overlap_end(end, a0, a1, b0, b1, eps);
        if (q - p).norm() <= eps {
            return Ok(Interposition::Point(p));
        }
        return Ok(Interposition::Segment(p, q));
    }

    let denom = cross(&da, &db);
    if denom.abs() / (len_a * len_b) < 1e-12 {
        return Ok(Interposition::Disjoint);
    }

    // Endpoint contacts first, so shared vertices keep exact coordinates.
    for p in [a0, a1] {
        if point_on_segment(p, b0, b1, eps) {
            return Ok(Interposition::Point(*p));
        }
    }
    for p in [b0, b1] {
        if point_on_segment(p, a0, a1, eps) {
            return Ok(Interposition::Point(*p));
        }
    }

    let w = b0 - a0;
    let t = cross(&w, &db) / denom;
    let s = cross(&w, &da) / denom;
    if !(t.is_finite() && s.is_finite()) {
        return Err(Error::NotComputed("intersection parameter is not finite".into()));
    }

    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&s) {
        return Ok(Interposition::Point(a0 + da * t));
    }

    Ok(Interposition::Disjoint)
}

/// Snaps an overlap end (parameter along `a`) to an existing endpoint when
/// one is within `eps`.
fn pick_overlap_end(
    t: f64,
    a0: &Point2<f64>,
    a1: &Point2<f64>,
    b0: &Point2<f64>,
    b1: &Point2<f64>,
    eps: f64,
) -> Point2<f64> {
    let raw = a0 + (a1 - a0) * t;
    [a0, a1, b0, b1]
        .into_iter()
        .find(|p| (**p - raw).norm() <= eps)
        .copied()
        .unwrap_or(raw)
}

/// Even-odd ray casting test. Boundary points get an arbitrary answer; use
/// [`calc_point_position`] when the boundary matters.
pub fn point_in_polygon(points: &[Point2<f64>], p: &Point2<f64>) -> bool {
    let n = points.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let pi = &points[i];
        let pj = &points[j];
        if (pi.y > p.y) != (pj.y > p.y) {
            let x = pj.x + (p.y - pj.y) * (pi.x - pj.x) / (pi.y - pj.y);
            if p.x < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Position of `point` relative to the closed polygon `contour`.
///
/// Vertex matches win over edge matches, edge matches over the ray cast.
pub fn calc_point_position(contour: &[Point2<f64>], point: &Point2<f64>, eps: f64) -> PointLocation {
    if let Some(i) = contour.iter().position(|v| (v - point).norm() <= eps) {
        return PointLocation::OnVertex(i);
    }
    let n = contour.len();
    for i in 0..n {
        if point_on_segment(point, &contour[i], &contour[(i + 1) % n], eps) {
            return PointLocation::OnEdge(i);
        }
    }
    if point_in_polygon(contour, point) {
        PointLocation::Inside
    } else {
        PointLocation::Outside
    }
}

/// Shoelace area; positive for counter-clockwise winding.
pub fn area_signed(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let p = &points[i];
        let q = &points[(i + 1) % n];
        sum += p.x * q.y - q.x * p.y;
    }
    sum * 0.5
}

/// A point strictly inside a simple polygon, for containment tests between
/// rings. Falls back to the centroid of the first triangle-ish corner.
pub fn interior_point(points: &[Point2<f64>], eps: f64) -> Option<Point2<f64>> {
    let n = points.len();
    if n < 3 {
        return None;
    }
    let orientation = area_signed(points).signum();
    // Nudge each edge midpoint inwards (to the left for CCW rings).
    for i in 0..n {
        let a = &points[i];
        let b = &points[(i + 1) % n];
        let d = b - a;
        let len = d.norm();
        if len <= eps {
            continue;
        }
        let inward = Vector2::new(-d.y, d.x) / len * orientation;
        let mid = Point2::from((a.coords + b.coords) * 0.5);
        for scale in [1e-3, 1e-2, 1e-1] {
            let candidate = mid + inward * (len * scale).max(eps * 4.0);
            if let PointLocation::Inside = calc_point_position(points, &candidate, eps) {
                return Some(candidate);
            }
        }
    }
    None
}
