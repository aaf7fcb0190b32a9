// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Walking contour graphs.

use std::f64::consts::TAU;

use nalgebra::{Point2, Vector2};
use rustc_hash::{FxHashMap, FxHashSet};
use sbrep_geometry::geometry2d::area_signed;
use smallvec::SmallVec;

use super::contour::IntersectContour;
use crate::error::{Error, Result};
use crate::keys::{PointKey, SegmentKey};

/// One edge traversal of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkStep {
    pub from: PointKey,
    pub to: PointKey,
    pub edge: SegmentKey,
}

/// A cycle or open chain of a contour, as positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    /// Points in walking order; a closed ring does not repeat its start.
    pub points: Vec<Point2<f64>>,
    pub closed: bool,
}

impl Ring {
    /// Signed area of a closed ring, zero for an open chain.
    pub fn area(&self) -> f64 {
        if self.closed {
            area_signed(&self.points)
        } else {
            0.0
        }
    }
}

/// Lazy single-pass walk over one cycle or chain of a contour.
///
/// Edges are followed in their own direction where possible. At points with
/// more than two edges the walk takes the sharpest left turn. The walk ends
/// when it returns to its start or runs out of unused edges, so it may pass
/// through a point more than once; [`IntersectContour::rings`] splits such
/// walks into simple cycles.
#[derive(Debug, Clone)]
pub struct ContourWalk<'a> {
    contour: &'a IntersectContour,
    start: PointKey,
    current: PointKey,
    incoming: Option<Vector2<f64>>,
    used: FxHashSet<SegmentKey>,
    done: bool,
}

impl<'a> ContourWalk<'a> {
    fn new(contour: &'a IntersectContour, start: PointKey, used: FxHashSet<SegmentKey>) -> Self {
        Self {
            contour,
            start,
            current: start,
            incoming: None,
            used,
            done: false,
        }
    }

    /// Point the walk started from.
    pub fn start(&self) -> PointKey {
        self.start
    }

    fn into_used(self) -> FxHashSet<SegmentKey> {
        self.used
    }

    fn pick(&self, candidates: &[SegmentKey]) -> Option<SegmentKey> {
        let contour = self.contour;
        let outgoing: SmallVec<[SegmentKey; 4]> = candidates
            .iter()
            .copied()
            .filter(|&k| contour.edges[k].start == self.current)
            .collect();
        let pool: &[SegmentKey] = if outgoing.is_empty() { candidates } else { &outgoing };

        let Some(incoming) = self.incoming else {
            return pool.first().copied();
        };
        let pivot = contour.points[self.current].position;
        let back = -incoming;
        pool.iter().copied().max_by(|&a, &b| {
            let angle = |k: SegmentKey| {
                let d = contour.points[self.far_end(k)].position - pivot;
                let theta = back.perp(&d).atan2(back.dot(&d));
                if theta < 0.0 {
                    theta + TAU
                } else {
                    theta
                }
            };
            angle(a).total_cmp(&angle(b))
        })
    }

    fn far_end(&self, k: SegmentKey) -> PointKey {
        let e = &self.contour.edges[k];
        if e.start == self.current {
            e.end
        } else {
            e.start
        }
    }
}

impl Iterator for ContourWalk<'_> {
    type Item = WalkStep;

    fn next(&mut self) -> Option<WalkStep> {
        if self.done {
            return None;
        }
        let point = self.contour.points.get(self.current)?;
        let candidates: SmallVec<[SegmentKey; 4]> = point
            .edges
            .iter()
            .copied()
            .filter(|k| !self.used.contains(k))
            .collect();
        let Some(edge) = self.pick(&candidates) else {
            self.done = true;
            return None;
        };

        let from = self.current;
        let to = self.far_end(edge);
        self.used.insert(edge);
        self.incoming = Some(self.contour.points[to].position - self.contour.points[from].position);
        self.current = to;
        if to == self.start {
            self.done = true;
        }
        Some(WalkStep { from, to, edge })
    }
}

/// Point positions along a [`ContourWalk`]. Open chains end with their last
/// point; cycles do not repeat the start.
#[derive(Debug, Clone)]
pub struct ContourPoints<'a> {
    walk: ContourWalk<'a>,
    tail: Option<PointKey>,
}

impl Iterator for ContourPoints<'_> {
    type Item = Point2<f64>;

    fn next(&mut self) -> Option<Point2<f64>> {
        let contour: &IntersectContour = self.walk.contour;
        let points = &contour.points;
        match self.walk.next() {
            Some(step) => {
                self.tail = Some(step.to);
                Some(points[step.from].position)
            }
            None => {
                let tail = self.tail.take()?;
                (tail != self.walk.start).then(|| points[tail].position)
            }
        }
    }
}

impl IntersectContour {
    /// Fails with [`Error::NotTraversable`] when a point has an odd number
    /// of edges other than one.
    pub fn check_traversable(&self) -> Result<()> {
        for (_, p) in self.points() {
            let degree = p.edges.len();
            if degree > 1 && degree % 2 == 1 {
                return Err(Error::NotTraversable(format!(
                    "point ({}, {}) has {degree} edges",
                    p.position.x, p.position.y
                )));
            }
        }
        Ok(())
    }

    /// Start point for the next walk over the edges not in `used`: a point
    /// with one remaining edge if any, otherwise the start of the first
    /// remaining edge.
    fn walk_start(&self, used: &FxHashSet<SegmentKey>) -> Option<PointKey> {
        let remaining = |k: &PointKey| {
            self.points[*k]
                .edges
                .iter()
                .filter(|e| !used.contains(e))
                .count()
        };
        self.points
            .keys()
            .find(|k| remaining(k) == 1)
            .or_else(|| {
                self.edges
                    .iter()
                    .find(|(k, _)| !used.contains(k))
                    .map(|(_, e)| e.start)
            })
    }

    /// Walks one cycle or chain.
    pub fn edges_walk(&self) -> Result<ContourWalk<'_>> {
        self.check_traversable()?;
        let used = FxHashSet::default();
        let start = self
            .walk_start(&used)
            .ok_or_else(|| Error::NotTraversable("contour has no edges".into()))?;
        Ok(ContourWalk::new(self, start, used))
    }

    /// Positions along [`edges_walk`](Self::edges_walk).
    pub fn contour(&self) -> Result<ContourPoints<'_>> {
        Ok(ContourPoints {
            walk: self.edges_walk()?,
            tail: None,
        })
    }

    /// Every walk needed to cover all edges, split into pieces that visit
    /// each point at most once.
    pub(crate) fn cycles(&self) -> Result<Vec<Vec<WalkStep>>> {
        self.check_traversable()?;
        let mut used = FxHashSet::default();
        let mut cycles = Vec::new();
        while let Some(start) = self.walk_start(&used) {
            let mut walk = ContourWalk::new(self, start, used);
            let steps: Vec<WalkStep> = walk.by_ref().collect();
            used = walk.into_used();
            if steps.is_empty() {
                break;
            }
            cycles.extend(split_at_repeats(steps));
        }
        Ok(cycles)
    }

    /// All cycles and chains of the contour.
    pub fn rings(&self) -> Result<Vec<Ring>> {
        Ok(self
            .cycles()?
            .into_iter()
            .map(|steps| {
                let closed = steps.first().map(|s| s.from) == steps.last().map(|s| s.to);
                let mut points: Vec<Point2<f64>> =
                    steps.iter().map(|s| self.points[s.from].position).collect();
                if !closed {
                    if let Some(last) = steps.last() {
                        points.push(self.points[last.to].position);
                    }
                }
                Ring { points, closed }
            })
            .collect())
    }

    /// Signed area enclosed by all closed cycles.
    pub fn area(&self) -> Result<f64> {
        Ok(self.rings()?.iter().map(Ring::area).sum())
    }
}

/// Cuts a walk wherever it returns to a point it already left: every such
/// return closes a simple cycle. Whatever remains is the last piece.
fn split_at_repeats(steps: Vec<WalkStep>) -> Vec<Vec<WalkStep>> {
    let mut pieces = Vec::new();
    let mut stack: Vec<WalkStep> = Vec::with_capacity(steps.len());
    let mut left_at: FxHashMap<PointKey, usize> = FxHashMap::default();
    for step in steps {
        left_at.insert(step.from, stack.len());
        stack.push(step);
        if let Some(&i) = left_at.get(&step.to) {
            let piece = stack.split_off(i);
            for s in &piece {
                left_at.remove(&s.from);
            }
            pieces.push(piece);
        }
    }
    if !stack.is_empty() {
        pieces.push(stack);
    }
    pieces
}
