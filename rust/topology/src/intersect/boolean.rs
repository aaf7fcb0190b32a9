// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge classification and boolean selection.

use nalgebra::{center, Point2};
use tracing::debug;

use super::contour::{EdgePosition, IntersectContour, PointPosition};
use crate::error::{Error, Result};
use crate::keys::{PointKey, SegmentKey};

/// Boolean operation between two closed contours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    /// Region inside both operands.
    Intersection,
    /// Region inside the left operand and outside the right one.
    Difference,
}

impl IntersectContour {
    /// Stores the position of every point relative to `other`.
    pub fn classify_points(&mut self, other: &IntersectContour, eps: f64) {
        for point in self.points.values_mut() {
            point.state = other.calc_point_position(&point.position, eps);
        }
    }

    /// Position of one (already split) edge relative to `other`.
    ///
    /// An endpoint strictly inside or outside decides the edge. When both
    /// endpoints are on the other boundary the edge either runs along it or
    /// cuts across as a diagonal; a coincident edge of `other` settles the
    /// first case, the midpoint settles the rest.
    pub fn classify_edge_position(
        &self,
        edge: SegmentKey,
        other: &IntersectContour,
        eps: f64,
    ) -> Result<EdgePosition> {
        let e = self
            .edges
            .get(edge)
            .ok_or_else(|| Error::DegenerateContour("unknown contour edge".into()))?;
        let (p, q) = self.segment(edge)?;
        let state_of = |key: PointKey, position: &Point2<f64>| match self.points[key].state {
            PointPosition::Undefined => other.calc_point_position(position, eps),
            state => state,
        };
        let s = state_of(e.start, &p);
        let t = state_of(e.end, &q);

        for state in [s, t] {
            match state {
                PointPosition::InPlane => return Ok(EdgePosition::InPlane),
                PointPosition::OutPlane => return Ok(EdgePosition::OutPlane),
                _ => {}
            }
        }

        match (s, t) {
            (PointPosition::OnVertex(a), PointPosition::OnVertex(b)) => {
                if let Some(k) = other.edge_between(a, b) {
                    return Ok(EdgePosition::ExistingEdge(k));
                }
            }
            (PointPosition::OnEdge(a), PointPosition::OnEdge(b)) if a == b => {
                return Ok(EdgePosition::EdgeSegment(a));
            }
            (PointPosition::OnVertex(v), PointPosition::OnEdge(k))
            | (PointPosition::OnEdge(k), PointPosition::OnVertex(v)) => {
                let touches = other
                    .edges
                    .get(k)
                    .is_some_and(|oe| oe.start == v || oe.end == v);
                if touches {
                    return Ok(EdgePosition::EdgeSegment(k));
                }
            }
            _ => {}
        }

        let mid = center(&p, &q);
        match other.calc_point_position(&mid, eps) {
            PointPosition::InPlane => Ok(EdgePosition::InPlane),
            PointPosition::OutPlane => Ok(EdgePosition::OutPlane),
            PointPosition::OnEdge(k) => Ok(EdgePosition::EdgeSegment(k)),
            position => Err(Error::AmbiguousEdge(format!(
                "edge ({}, {}) → ({}, {}) has midpoint {position:?}",
                p.x, p.y, q.x, q.y
            ))),
        }
    }

    /// Classifies every edge against `other`.
    pub fn classify_edges(&mut self, other: &IntersectContour, eps: f64) -> Result<()> {
        let keys: Vec<SegmentKey> = self.edges.keys().collect();
        for key in keys {
            let state = self.classify_edge_position(key, other, eps)?;
            self.edges[key].state = state;
        }
        Ok(())
    }

    /// Rebuilds point incidence from the edge list and drops points no edge
    /// uses.
    pub fn reindex_points_parents(&mut self) {
        for point in self.points.values_mut() {
            point.edges.clear();
        }
        let links: Vec<_> = self.edges.iter().map(|(k, e)| (k, e.start, e.end)).collect();
        for (k, start, end) in links {
            for p in [start, end] {
                if let Some(point) = self.points.get_mut(p) {
                    point.edges.push(k);
                }
            }
        }
        self.points.retain(|_, p| !p.edges.is_empty());
    }

    /// `left ∩ right`.
    pub fn intersect(left: &IntersectContour, right: &IntersectContour, eps: f64) -> Result<Self> {
        Self::boolean(left, right, BooleanOp::Intersection, eps)
    }

    /// `left − right`.
    pub fn difference(left: &IntersectContour, right: &IntersectContour, eps: f64) -> Result<Self> {
        Self::boolean(left, right, BooleanOp::Difference, eps)
    }

    /// Runs a boolean between two closed contours.
    ///
    /// Edge selection per operation, with `R` the right contour:
    ///
    /// | left edge        | ∩     | −     |
    /// |------------------|-------|-------|
    /// | inside `R`       | keep  | drop  |
    /// | outside `R`      | drop  | keep  |
    /// | along `R`, same direction     | keep | drop |
    /// | along `R`, opposite direction | drop | keep |
    ///
    /// Right edges inside the left contour are kept for ∩ and kept reversed
    /// for −; right edges along the left boundary are already covered by the
    /// left side.
    pub fn boolean(
        left: &IntersectContour,
        right: &IntersectContour,
        op: BooleanOp,
        eps: f64,
    ) -> Result<Self> {
        let mut a = left.clone();
        let mut b = right.clone();
        a.normalize_orientation(eps)?;
        b.normalize_orientation(eps)?;

        let split_left = a.split_against(&b, eps)?;
        let split_right = b.split_against(&a, eps)?;

        a.classify_points(&b, eps);
        b.classify_points(&a, eps);
        a.classify_edges(&b, eps)?;
        b.classify_edges(&a, eps)?;

        let mut out = IntersectContour::new();
        for (_, e) in a.edges() {
            let p = a.points[e.start].position;
            let q = a.points[e.end].position;
            let keep = match e.state {
                EdgePosition::InPlane => op == BooleanOp::Intersection,
                EdgePosition::OutPlane => op == BooleanOp::Difference,
                EdgePosition::ExistingEdge(k) | EdgePosition::EdgeSegment(k) => {
                    let (r0, r1) = b.segment(k)?;
                    let same = (q - p).dot(&(r1 - r0)) > 0.0;
                    same == (op == BooleanOp::Intersection)
                }
                EdgePosition::Undefined => {
                    return Err(Error::AmbiguousEdge("left edge was never classified".into()));
                }
            };
            if keep {
                out.push_segment(p, q, e.state, eps)?;
            }
        }
        for (_, e) in b.edges() {
            if e.state != EdgePosition::InPlane {
                continue;
            }
            let p = b.points[e.start].position;
            let q = b.points[e.end].position;
            match op {
                BooleanOp::Intersection => out.push_segment(p, q, e.state, eps)?,
                BooleanOp::Difference => out.push_segment(q, p, e.state, eps)?,
            }
        }
        out.reindex_points_parents();

        debug!(
            ?op,
            split_left,
            split_right,
            edges = out.edge_count(),
            "contour boolean"
        );
        Ok(out)
    }

    /// Appends a directed segment unless an identical one exists.
    fn push_segment(
        &mut self,
        p: Point2<f64>,
        q: Point2<f64>,
        state: EdgePosition,
        eps: f64,
    ) -> Result<()> {
        let start = self.add_point(p, eps);
        let end = self.add_point(q, eps);
        if start == end {
            return Ok(());
        }
        let duplicate = self.points[start]
            .edges
            .iter()
            .any(|&k| self.edges[k].start == start && self.edges[k].end == end);
        if !duplicate {
            self.add_edge_with_state(start, end, state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPS: f64 = 1e-6;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> IntersectContour {
        IntersectContour::from_ring(
            &[
                Point2::new(x0, y0),
                Point2::new(x1, y0),
                Point2::new(x1, y1),
                Point2::new(x0, y1),
            ],
            EPS,
        )
        .unwrap()
    }

    #[test]
    fn intersect_with_itself_is_identity() {
        let a = rect(0.0, 0.0, 4.0, 3.0);
        let i = IntersectContour::intersect(&a, &a, EPS).unwrap();
        assert_eq!(i.edge_count(), 4);
        assert_eq!(i.point_count(), 4);
        assert_relative_eq!(i.area().unwrap(), 12.0, epsilon = 1e-9);
    }

    #[test]
    fn difference_with_itself_is_empty() {
        let a = rect(0.0, 0.0, 4.0, 3.0);
        let d = IntersectContour::difference(&a, &a, EPS).unwrap();
        assert!(d.is_empty());
        assert_relative_eq!(d.area().unwrap(), 0.0);
    }

    #[test]
    fn overlapping_rectangles() {
        let a = rect(0.0, 0.0, 4.0, 4.0);
        let b = rect(2.0, 2.0, 6.0, 6.0);
        let i = IntersectContour::intersect(&a, &b, EPS).unwrap();
        let d = IntersectContour::difference(&a, &b, EPS).unwrap();
        assert_relative_eq!(i.area().unwrap(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(d.area().unwrap(), 12.0, epsilon = 1e-9);
        assert_eq!(d.rings().unwrap().len(), 1);
    }

    #[test]
    fn contained_clip_leaves_a_hole() {
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(2.0, 2.0, 8.0, 8.0);
        let i = IntersectContour::intersect(&a, &b, EPS).unwrap();
        let d = IntersectContour::difference(&a, &b, EPS).unwrap();
        assert_relative_eq!(i.area().unwrap(), 36.0, epsilon = 1e-9);
        assert_relative_eq!(d.area().unwrap(), 64.0, epsilon = 1e-9);
        assert_eq!(d.rings().unwrap().len(), 2);
    }

    #[test]
    fn shared_edge_is_split_between_results() {
        // Clip shares the lower part of the right edge and sticks out.
        let a = rect(0.0, 0.0, 10.0, 10.0);
        let b = rect(6.0, 0.0, 14.0, 4.0);
        let i = IntersectContour::intersect(&a, &b, EPS).unwrap();
        let d = IntersectContour::difference(&a, &b, EPS).unwrap();
        assert_relative_eq!(i.area().unwrap(), 16.0, epsilon = 1e-9);
        assert_relative_eq!(d.area().unwrap(), 84.0, epsilon = 1e-9);
    }

    #[test]
    fn concave_left_operand() {
        // U shape opening upwards, clipped by a bar across both arms.
        let u = IntersectContour::from_ring(
            &[
                Point2::new(0.0, 0.0),
                Point2::new(9.0, 0.0),
                Point2::new(9.0, 9.0),
                Point2::new(6.0, 9.0),
                Point2::new(6.0, 3.0),
                Point2::new(3.0, 3.0),
                Point2::new(3.0, 9.0),
                Point2::new(0.0, 9.0),
            ],
            EPS,
        )
        .unwrap();
        let bar = rect(-1.0, 5.0, 10.0, 7.0);
        let i = IntersectContour::intersect(&u, &bar, EPS).unwrap();
        let d = IntersectContour::difference(&u, &bar, EPS).unwrap();
        assert_relative_eq!(i.area().unwrap(), 12.0, epsilon = 1e-9);
        assert_relative_eq!(d.area().unwrap(), 51.0, epsilon = 1e-9);
        assert_eq!(i.rings().unwrap().len(), 2);
        assert_eq!(d.rings().unwrap().len(), 3);
    }

    #[test]
    fn diagonal_between_boundary_points_uses_midpoint() {
        let a = IntersectContour::from_polyline(&[Point2::new(0.0, 0.0), Point2::new(10.0, 10.0)], EPS)
            .unwrap();
        let b = rect(0.0, 0.0, 10.0, 10.0);
        let mut a = a;
        a.classify_points(&b, EPS);
        let key = a.edges().next().unwrap().0;
        assert_eq!(a.classify_edge_position(key, &b, EPS).unwrap(), EdgePosition::InPlane);
    }
}
