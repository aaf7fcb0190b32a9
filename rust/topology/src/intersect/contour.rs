// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contour graph storage, point location and crossing splits.

use nalgebra::Point2;
use sbrep_geometry::geometry2d::{
    area_signed, edges_interposition, interior_point, point_in_polygon, point_on_segment,
    sort_points_on_edge, Interposition,
};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::keys::{PointKey, SegmentKey};

/// Position of a point relative to another contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointPosition {
    #[default]
    Undefined,
    InPlane,
    OutPlane,
    /// On the interior of an edge of the other contour.
    OnEdge(SegmentKey),
    /// Coincides with a point of the other contour.
    OnVertex(PointKey),
}

impl PointPosition {
    /// `true` for positions on the other contour's boundary.
    pub fn is_boundary(self) -> bool {
        matches!(self, Self::OnEdge(_) | Self::OnVertex(_))
    }
}

/// Position of an edge relative to another contour, valid after splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EdgePosition {
    #[default]
    Undefined,
    InPlane,
    OutPlane,
    /// Coincides exactly with an edge of the other contour.
    ExistingEdge(SegmentKey),
    /// Lies along part of an edge of the other contour.
    EdgeSegment(SegmentKey),
}

#[derive(Debug, Clone)]
pub struct ContourPoint {
    pub position: Point2<f64>,
    pub state: PointPosition,
    /// Incident edges, in either direction.
    pub edges: SmallVec<[SegmentKey; 2]>,
}

#[derive(Debug, Clone)]
pub struct ContourEdge {
    pub start: PointKey,
    pub end: PointKey,
    pub state: EdgePosition,
}

/// How an edge meets the other contour at a crossing point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossingKind {
    /// Proper crossing or touch in the interior of the other edge.
    Point,
    /// The crossing is an existing point of the other contour.
    ExistingPoint(PointKey),
    /// The whole edge overlaps this edge of the other contour; there is
    /// nothing to split.
    AllEdge(SegmentKey),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    pub point: Point2<f64>,
    pub kind: CrossingKind,
}

/// Planar graph of 2D points and directed edges.
#[derive(Debug, Clone, Default)]
pub struct IntersectContour {
    pub(crate) points: SlotMap<PointKey, ContourPoint>,
    pub(crate) edges: SlotMap<SegmentKey, ContourEdge>,
}

impl IntersectContour {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed ring, oriented counter-clockwise. Consecutive duplicates are
    /// dropped; fewer than three distinct points is a degenerate contour.
    pub fn from_ring(points: &[Point2<f64>], eps: f64) -> Result<Self> {
        let mut contour = Self::new();
        contour.add_ring(points, Some(true), eps)?;
        Ok(contour)
    }

    /// Polygon with holes: the outer ring is oriented counter-clockwise and
    /// every hole clockwise.
    pub fn from_rings(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>], eps: f64) -> Result<Self> {
        let mut contour = Self::new();
        contour.add_ring(outer, Some(true), eps)?;
        for hole in holes {
            contour.add_ring(hole, Some(false), eps)?;
        }
        Ok(contour)
    }

    /// Open chain through `points` in the given order.
    pub fn from_polyline(points: &[Point2<f64>], eps: f64) -> Result<Self> {
        let mut contour = Self::new();
        let keys = contour.add_points(points, eps);
        if keys.len() < 2 {
            return Err(Error::DegenerateContour(format!(
                "polyline has {} distinct points",
                keys.len()
            )));
        }
        for pair in keys.windows(2) {
            contour.add_edge(pair[0], pair[1])?;
        }
        Ok(contour)
    }

    /// Adds a closed ring. `ccw` forces an orientation when set.
    pub fn add_ring(&mut self, points: &[Point2<f64>], ccw: Option<bool>, eps: f64) -> Result<()> {
        let mut ring: Vec<Point2<f64>> = Vec::with_capacity(points.len());
        for p in points {
            if ring.last().map_or(true, |q| (q - p).norm() > eps) {
                ring.push(*p);
            }
        }
        while ring.len() > 1 && (ring[0] - ring[ring.len() - 1]).norm() <= eps {
            ring.pop();
        }
        if ring.len() < 3 {
            return Err(Error::DegenerateContour(format!(
                "ring has {} distinct points",
                ring.len()
            )));
        }
        if let Some(ccw) = ccw {
            if (area_signed(&ring) > 0.0) != ccw {
                ring.reverse();
            }
        }

        let keys = self.add_points(&ring, eps);
        for i in 0..keys.len() {
            self.add_edge(keys[i], keys[(i + 1) % keys.len()])?;
        }
        Ok(())
    }

    fn add_points(&mut self, points: &[Point2<f64>], eps: f64) -> Vec<PointKey> {
        let mut keys: Vec<PointKey> = Vec::with_capacity(points.len());
        for p in points {
            let k = self.add_point(*p, eps);
            if keys.last() != Some(&k) {
                keys.push(k);
            }
        }
        keys
    }

    /// Adds a point, or returns the existing point within `eps`.
    pub fn add_point(&mut self, position: Point2<f64>, eps: f64) -> PointKey {
        if let Some(k) = self.find_point(&position, eps) {
            return k;
        }
        self.points.insert(ContourPoint {
            position,
            state: PointPosition::Undefined,
            edges: SmallVec::new(),
        })
    }

    /// Nearest point within `eps`.
    pub fn find_point(&self, position: &Point2<f64>, eps: f64) -> Option<PointKey> {
        self.points
            .iter()
            .map(|(k, p)| (k, (p.position - position).norm()))
            .filter(|&(_, d)| d <= eps)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(k, _)| k)
    }

    /// Adds a directed edge between two existing points.
    pub fn add_edge(&mut self, start: PointKey, end: PointKey) -> Result<SegmentKey> {
        self.add_edge_with_state(start, end, EdgePosition::Undefined)
    }

    pub(crate) fn add_edge_with_state(
        &mut self,
        start: PointKey,
        end: PointKey,
        state: EdgePosition,
    ) -> Result<SegmentKey> {
        if start == end {
            return Err(Error::DegenerateContour("edge starts and ends at one point".into()));
        }
        if !self.points.contains_key(start) || !self.points.contains_key(end) {
            return Err(Error::DegenerateContour("edge refers to a missing point".into()));
        }
        let key = self.edges.insert(ContourEdge { start, end, state });
        self.points[start].edges.push(key);
        self.points[end].edges.push(key);
        Ok(key)
    }

    /// Removes an edge and unregisters it from its points.
    pub fn remove_edge(&mut self, key: SegmentKey) -> Option<ContourEdge> {
        let edge = self.edges.remove(key)?;
        for p in [edge.start, edge.end] {
            if let Some(point) = self.points.get_mut(p) {
                point.edges.retain(|e| *e != key);
            }
        }
        Some(edge)
    }

    pub fn point(&self, key: PointKey) -> Option<&ContourPoint> {
        self.points.get(key)
    }

    pub fn edge(&self, key: SegmentKey) -> Option<&ContourEdge> {
        self.edges.get(key)
    }

    pub fn points(&self) -> impl Iterator<Item = (PointKey, &ContourPoint)> + '_ {
        self.points.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = (SegmentKey, &ContourEdge)> + '_ {
        self.edges.iter()
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// End positions of an edge.
    pub fn segment(&self, key: SegmentKey) -> Result<(Point2<f64>, Point2<f64>)> {
        let edge = self
            .edges
            .get(key)
            .ok_or_else(|| Error::DegenerateContour("unknown contour edge".into()))?;
        Ok((self.points[edge.start].position, self.points[edge.end].position))
    }

    /// The edge joining two points, in either direction.
    pub fn edge_between(&self, a: PointKey, b: PointKey) -> Option<SegmentKey> {
        let point = self.points.get(a)?;
        point.edges.iter().copied().find(|&k| {
            let e = &self.edges[k];
            (e.start == a && e.end == b) || (e.start == b && e.end == a)
        })
    }

    /// Locates `position` against this contour.
    ///
    /// A point within `eps` of a contour point is `OnVertex`, otherwise a
    /// point within `eps` of an edge is `OnEdge`; everything else is decided
    /// by even-odd ray casting over all edges.
    pub fn calc_point_position(&self, position: &Point2<f64>, eps: f64) -> PointPosition {
        if let Some(k) = self.find_point(position, eps) {
            return PointPosition::OnVertex(k);
        }
        for (k, e) in &self.edges {
            let a = &self.points[e.start].position;
            let b = &self.points[e.end].position;
            if point_on_segment(position, a, b, eps) {
                return PointPosition::OnEdge(k);
            }
        }

        let mut inside = false;
        for e in self.edges.values() {
            let a = &self.points[e.start].position;
            let b = &self.points[e.end].position;
            if (a.y > position.y) != (b.y > position.y) {
                let x = a.x + (position.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if position.x < x {
                    inside = !inside;
                }
            }
        }
        if inside {
            PointPosition::InPlane
        } else {
            PointPosition::OutPlane
        }
    }

    /// Crossings of one edge of this contour with every edge of `other`.
    ///
    /// Crossings on the edge's own endpoints are dropped; they are already
    /// represented by the endpoint classification.
    pub fn calc_edge_positions(
        &self,
        edge: SegmentKey,
        other: &IntersectContour,
        eps: f64,
    ) -> Result<Vec<Crossing>> {
        let (a0, a1) = self.segment(edge)?;
        let at_end = |p: &Point2<f64>| (p - a0).norm() <= eps || (p - a1).norm() <= eps;

        let mut crossings: Vec<Crossing> = Vec::new();
        for (k, e) in &other.edges {
            let b0 = other.points[e.start].position;
            let b1 = other.points[e.end].position;
            let kind_at = |p: &Point2<f64>| {
                if (p - b0).norm() <= eps {
                    CrossingKind::ExistingPoint(e.start)
                } else if (p - b1).norm() <= eps {
                    CrossingKind::ExistingPoint(e.end)
                } else {
                    CrossingKind::Point
                }
            };

            match edges_interposition(&a0, &a1, &b0, &b1, eps)? {
                Interposition::Disjoint | Interposition::Collinear => {}
                Interposition::Point(p) => {
                    if !at_end(&p) {
                        crossings.push(Crossing { point: p, kind: kind_at(&p) });
                    }
                }
                Interposition::Segment(p, q) => {
                    if at_end(&p) && at_end(&q) {
                        crossings.push(Crossing {
                            point: p,
                            kind: CrossingKind::AllEdge(k),
                        });
                        continue;
                    }
                    for r in [p, q] {
                        if !at_end(&r) {
                            crossings.push(Crossing { point: r, kind: kind_at(&r) });
                        }
                    }
                }
            }
        }

        let mut unique: Vec<Crossing> = Vec::with_capacity(crossings.len());
        for c in crossings {
            let duplicate = unique.iter().any(|u| {
                (u.point - c.point).norm() <= eps
                    && !matches!(u.kind, CrossingKind::AllEdge(_))
                    && !matches!(c.kind, CrossingKind::AllEdge(_))
            });
            if !duplicate {
                unique.push(c);
            }
        }
        Ok(unique)
    }

    /// Splits every edge at its crossings with `other`. Returns the number
    /// of points inserted.
    ///
    /// Each inserted point must lie on the boundary of `other`; anything
    /// else means the crossing computation and the point location disagree.
    pub fn split_against(&mut self, other: &IntersectContour, eps: f64) -> Result<usize> {
        let keys: Vec<SegmentKey> = self.edges.keys().collect();
        let mut inserted = 0;

        for key in keys {
            let mut points: Vec<Point2<f64>> = self
                .calc_edge_positions(key, other, eps)?
                .into_iter()
                .filter(|c| !matches!(c.kind, CrossingKind::AllEdge(_)))
                .map(|c| c.point)
                .collect();
            if points.is_empty() {
                continue;
            }

            let (a0, a1) = self.segment(key)?;
            sort_points_on_edge(&a0, &a1, &mut points);
            points.dedup_by(|p, q| (*p - *q).norm() <= eps);

            for p in &points {
                let position = other.calc_point_position(p, eps);
                if !position.is_boundary() {
                    return Err(Error::InconsistentSplit(format!(
                        "split point ({}, {}) classifies as {position:?}",
                        p.x, p.y
                    )));
                }
            }

            inserted += self.split_edge_at(key, &points, eps)?;
        }
        Ok(inserted)
    }

    /// Replaces an edge by a chain through `points`, ordered from its start.
    fn split_edge_at(&mut self, key: SegmentKey, points: &[Point2<f64>], eps: f64) -> Result<usize> {
        let Some(edge) = self.remove_edge(key) else {
            return Ok(0);
        };
        let before = self.points.len();
        let mut chain = vec![edge.start];
        for p in points {
            let k = self.add_point(*p, eps);
            if chain.last() != Some(&k) && k != edge.end {
                chain.push(k);
            }
        }
        chain.push(edge.end);

        for pair in chain.windows(2) {
            self.add_edge_with_state(pair[0], pair[1], edge.state)?;
        }
        Ok(self.points.len() - before)
    }

    /// Orients every closed cycle so the enclosed region lies on its left:
    /// cycles at even nesting depth counter-clockwise, odd depth clockwise.
    /// Open chains are left alone.
    pub fn normalize_orientation(&mut self, eps: f64) -> Result<()> {
        let cycles: Vec<_> = self
            .cycles()?
            .into_iter()
            .filter(|steps| steps.first().map(|s| s.from) == steps.last().map(|s| s.to))
            .collect();
        let polygons: Vec<Vec<Point2<f64>>> = cycles
            .iter()
            .map(|steps| steps.iter().map(|s| self.points[s.from].position).collect())
            .collect();

        for (i, steps) in cycles.iter().enumerate() {
            let depth = match interior_point(&polygons[i], eps) {
                Some(inner) => polygons
                    .iter()
                    .enumerate()
                    .filter(|&(j, poly)| j != i && point_in_polygon(poly, &inner))
                    .count(),
                None => 0,
            };
            let ccw = area_signed(&polygons[i]) > 0.0;
            let keep = ccw == (depth % 2 == 0);

            for s in steps {
                let e = &mut self.edges[s.edge];
                if keep {
                    e.start = s.from;
                    e.end = s.to;
                } else {
                    e.start = s.to;
                    e.end = s.from;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x0, y0),
            Point2::new(x0 + size, y0),
            Point2::new(x0 + size, y0 + size),
            Point2::new(x0, y0 + size),
        ]
    }

    #[test]
    fn ring_is_oriented_counter_clockwise() {
        let mut cw = square(0.0, 0.0, 1.0);
        cw.reverse();
        let c = IntersectContour::from_ring(&cw, EPS).unwrap();
        assert_eq!(c.point_count(), 4);
        assert_eq!(c.edge_count(), 4);
        let signed: f64 = c
            .edges()
            .map(|(_, e)| {
                let p = c.points[e.start].position;
                let q = c.points[e.end].position;
                p.x * q.y - q.x * p.y
            })
            .sum();
        assert!(signed > 0.0);
    }

    #[test]
    fn degenerate_ring_is_rejected() {
        let pts = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 0.0)];
        assert!(matches!(
            IntersectContour::from_ring(&pts, EPS),
            Err(Error::DegenerateContour(_))
        ));
    }

    #[test]
    fn point_positions() {
        let c = IntersectContour::from_ring(&square(0.0, 0.0, 10.0), EPS).unwrap();
        assert_eq!(c.calc_point_position(&Point2::new(5.0, 5.0), EPS), PointPosition::InPlane);
        assert_eq!(c.calc_point_position(&Point2::new(15.0, 5.0), EPS), PointPosition::OutPlane);
        assert!(matches!(
            c.calc_point_position(&Point2::new(10.0, 5.0), EPS),
            PointPosition::OnEdge(_)
        ));
        assert!(matches!(
            c.calc_point_position(&Point2::new(10.0, 10.0 + EPS / 2.0), EPS),
            PointPosition::OnVertex(_)
        ));
    }

    #[test]
    fn hole_is_outside() {
        let c = IntersectContour::from_rings(&square(0.0, 0.0, 10.0), &[square(2.0, 2.0, 6.0)], EPS)
            .unwrap();
        assert_eq!(c.calc_point_position(&Point2::new(5.0, 5.0), EPS), PointPosition::OutPlane);
        assert_eq!(c.calc_point_position(&Point2::new(1.0, 1.0), EPS), PointPosition::InPlane);
    }

    #[test]
    fn crossings_skip_own_endpoints() {
        let a = IntersectContour::from_polyline(&[Point2::new(0.0, 5.0), Point2::new(20.0, 5.0)], EPS)
            .unwrap();
        let b = IntersectContour::from_ring(&square(0.0, 0.0, 10.0), EPS).unwrap();
        let edge = a.edges.keys().next().unwrap();
        let crossings = a.calc_edge_positions(edge, &b, EPS).unwrap();
        // (0, 5) is the polyline's own start point.
        assert_eq!(crossings.len(), 1);
        assert_eq!(crossings[0].point, Point2::new(10.0, 5.0));
        assert_eq!(crossings[0].kind, CrossingKind::Point);
    }

    #[test]
    fn crossing_at_existing_point_is_tagged() {
        let a = IntersectContour::from_polyline(&[Point2::new(-5.0, -5.0), Point2::new(5.0, 5.0)], EPS)
            .unwrap();
        let b = IntersectContour::from_ring(&square(0.0, 0.0, 10.0), EPS).unwrap();
        let edge = a.edges.keys().next().unwrap();
        let crossings = a.calc_edge_positions(edge, &b, EPS).unwrap();
        assert_eq!(crossings.len(), 1);
        assert!(matches!(crossings[0].kind, CrossingKind::ExistingPoint(_)));
    }

    #[test]
    fn split_inserts_ordered_points() {
        let mut a = IntersectContour::from_polyline(&[Point2::new(-1.0, 5.0), Point2::new(11.0, 5.0)], EPS)
            .unwrap();
        let b = IntersectContour::from_ring(&square(0.0, 0.0, 10.0), EPS).unwrap();
        assert_eq!(a.split_against(&b, EPS).unwrap(), 2);
        assert_eq!(a.edge_count(), 3);
        let walk: Vec<Point2<f64>> = a.contour().unwrap().collect();
        assert_eq!(walk.len(), 4);
        assert!((walk[1] - Point2::new(0.0, 5.0)).norm() < 1e-9);
        assert!((walk[2] - Point2::new(10.0, 5.0)).norm() < 1e-9);
    }

    #[test]
    fn orientation_follows_nesting_depth() {
        let mut c = IntersectContour::new();
        c.add_ring(&square(0.0, 0.0, 10.0), Some(false), EPS).unwrap();
        c.add_ring(&square(2.0, 2.0, 6.0), Some(true), EPS).unwrap();
        c.normalize_orientation(EPS).unwrap();
        assert!((c.area().unwrap() - 64.0).abs() < 1e-9);
    }
}
