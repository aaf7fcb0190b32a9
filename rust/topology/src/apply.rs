// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cutting planar faces with contours.
//!
//! A clip contour is projected into the face's plane frame and combined with
//! the face's loops by [`IntersectContour`]: `face ∩ clip` becomes the inside
//! faces, `face − clip` the outside faces. The result rings are then written
//! back into the B-Rep:
//!
//! - ring points are matched to existing vertices, inserted on existing
//!   boundary edges ([`split_edge`](SbrepObject::split_edge)) or added as
//!   free vertices;
//! - verges are cut where new edges attach to them, so neighbouring faces
//!   keep sharing the same pieces;
//! - new edges are chained into verges and every ring becomes a loop
//!   (reusing an existing loop with the same verges).

use nalgebra::{Point2, Point3};
use rustc_hash::{FxHashMap, FxHashSet};
use sbrep_geometry::geometry2d::{interior_point, point_in_polygon, point_on_segment};
use sbrep_geometry::PlaneTransform;
use tracing::{debug, info, trace};

use crate::arena::SbrepObject;
use crate::config::Tolerances;
use crate::error::{Error, Result};
use crate::intersect::{IntersectContour, Ring};
use crate::keys::*;

/// Faces produced by [`SbrepObject::apply_intersect_contour_to_face`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    /// Faces covered by the clip contour.
    pub inside: Vec<FaceId>,
    /// Faces left outside the clip contour.
    pub outside: Vec<FaceId>,
}

/// A region of a boolean result: one outer ring and its holes.
type Region = (Ring, Vec<Ring>);

enum LoopCandidate {
    Ready(Vec<VergeId>),
    Retry(Vec<EdgeId>),
}

impl SbrepObject {
    /// Projects 3D points into the plane frame of a face.
    pub fn contour_projection(&self, face: FaceId, points: &[Point3<f64>]) -> Result<Vec<Point2<f64>>> {
        let frame = self.face_transform(face)?;
        Ok(frame.project_all(points))
    }

    /// The loops of a face as a contour in `frame`.
    pub fn face_contour(&self, face: FaceId, frame: &PlaneTransform) -> Result<IntersectContour> {
        let data = self.faces.try_get(face)?;
        let outer = self.loop_points_2d(data.outer_loop, frame)?;
        let holes = data
            .inner_loops
            .iter()
            .map(|&l| self.loop_points_2d(l, frame))
            .collect::<Result<Vec<_>>>()?;
        IntersectContour::from_rings(&outer, &holes, self.epsilon)
    }

    /// Cuts the closed contour `points` into `face`.
    ///
    /// The face is replaced by the faces of `face ∩ clip` (group
    /// `group_for_inside`, or one past the highest group in use) and
    /// `face − clip` (the face's own group). A clip that misses the face
    /// leaves it untouched; a clip covering it only regroups it.
    pub fn apply_intersect_contour_to_face(
        &mut self,
        face: FaceId,
        points: &[Point3<f64>],
        group_for_inside: Option<i32>,
        tolerances: &Tolerances,
    ) -> Result<ApplyResult> {
        let eps = self.epsilon;
        let area_eps = eps * eps;
        let data = self.faces.try_get(face)?.clone();
        let frame = self.face_transform(face)?;

        let region = self.face_contour(face, &frame)?;
        let clip = IntersectContour::from_ring(&frame.project_all(points), eps)?;
        if clip.area()?.abs() <= area_eps {
            return Err(Error::DegenerateContour("clip contour encloses no area".into()));
        }

        let inside = IntersectContour::intersect(&region, &clip, eps)?;
        let outside = IntersectContour::difference(&region, &clip, eps)?;
        let inside_area = inside.area()?;
        let outside_area = outside.area()?;
        let inside_group =
            group_for_inside.unwrap_or_else(|| self.max_group_id().map_or(0, |g| g + 1));
        debug!(%face, inside_area, outside_area, "clip contour against face");

        if inside_area <= area_eps {
            return Ok(ApplyResult {
                inside: Vec::new(),
                outside: vec![face],
            });
        }
        if outside_area <= area_eps {
            self.faces.try_get_mut(face)?.group_id = inside_group;
            return Ok(ApplyResult {
                inside: vec![face],
                outside: Vec::new(),
            });
        }

        let mut regions: Vec<(bool, Region)> = Vec::new();
        regions.extend(group_rings(inside.rings()?, eps)?.into_iter().map(|r| (true, r)));
        regions.extend(group_rings(outside.rings()?, eps)?.into_iter().map(|r| (false, r)));

        // Ring points → vertices. `boundary` tracks the face's edges as they
        // are split.
        let mut boundary = self.face_edges(face)?;
        let mut vertex_rings: Vec<Vec<Vec<VertexId>>> = Vec::with_capacity(regions.len());
        for (_, (outer, holes)) in &regions {
            let mut rings = Vec::with_capacity(1 + holes.len());
            for ring in std::iter::once(outer).chain(holes) {
                let mut vertices: Vec<VertexId> = Vec::with_capacity(ring.points.len());
                for p in &ring.points {
                    let v = self.attach_point(p, &frame, &mut boundary)?;
                    if vertices.last() != Some(&v) {
                        vertices.push(v);
                    }
                }
                if vertices.len() > 1 && vertices.first() == vertices.last() {
                    vertices.pop();
                }
                if vertices.len() < 3 {
                    return Err(Error::DegenerateContour(format!(
                        "result ring collapsed to {} vertices",
                        vertices.len()
                    )));
                }
                rings.push(vertices);
            }
            vertex_rings.push(rings);
        }

        // Ring edges, reusing existing ones.
        let mut candidates: Vec<Vec<EdgeId>> = Vec::new();
        let mut new_edges: Vec<EdgeId> = Vec::new();
        let mut seen_new = FxHashSet::default();
        for rings in &vertex_rings {
            for ring in rings {
                let mut edges = Vec::with_capacity(ring.len());
                for i in 0..ring.len() {
                    let e = self.add_edge(ring[i], ring[(i + 1) % ring.len()])?;
                    if self.edges.try_get(e)?.parent.is_none() && seen_new.insert(e) {
                        new_edges.push(e);
                    }
                    edges.push(e);
                }
                candidates.push(edges);
            }
        }

        // Cut the face's verges where new edges attach.
        let mut attach: Vec<VertexId> = Vec::new();
        for &e in &new_edges {
            let (a, b) = self.edge_vertices(e)?;
            attach.extend([a, b]);
        }
        attach.sort_unstable();
        attach.dedup();

        let mut touched: Vec<VergeId> = Vec::new();
        let old_verges: Vec<VergeId> = {
            let mut verges = Vec::new();
            for l in data.loops() {
                verges.extend_from_slice(&self.loops.try_get(l)?.verges);
            }
            verges.sort_unstable();
            verges.dedup();
            verges
        };
        for v in old_verges {
            touched.extend(self.split_verge(v, &attach)?);
        }
        for chain in self.separate_loop_edge_by_merged(&new_edges)? {
            touched.push(self.add_verge(&chain)?);
        }

        let loops = self.build_loops_from_edges(&candidates, tolerances.max_loop_repair_iterations)?;

        // Replace the face.
        self.remove_face(face)?;
        let mut result = ApplyResult::default();
        let mut next = loops.into_iter();
        for ((is_inside, _), rings) in regions.iter().zip(&vertex_rings) {
            let region_loops: Vec<LoopId> = next.by_ref().take(rings.len()).collect();
            let (outer, holes) = region_loops
                .split_first()
                .ok_or_else(|| Error::OpenLoop("result region has no loops".into()))?;
            let group = if *is_inside { inside_group } else { data.group_id };
            let f = self.add_face(group, data.plane, *outer, holes)?;
            self.define_face_outside_loop(f)?;
            if *is_inside {
                result.inside.push(f);
            } else {
                result.outside.push(f);
            }
        }

        // Drop whatever the old face left behind.
        for l in data.loops() {
            if self.loops.get(l).is_some_and(|lp| lp.parents.is_empty()) {
                self.remove_loop(l)?;
            }
        }
        for v in touched {
            if self.verges.get(v).is_some_and(|vd| vd.parents.is_empty()) {
                let verge = self.remove_verge(v)?;
                for e in verge.edges {
                    if self.edges.get(e).is_some_and(|ed| ed.parent.is_none()) {
                        self.remove_edge(e)?;
                    }
                }
            }
        }
        self.remove_unused_vertices();
        self.redefine_feedbacks();

        info!(
            %face,
            inside = result.inside.len(),
            outside = result.outside.len(),
            "applied contour to face"
        );
        Ok(result)
    }

    /// Vertex for a result ring point: an existing vertex, a new vertex on
    /// a boundary edge, or a free vertex.
    fn attach_point(
        &mut self,
        p: &Point2<f64>,
        frame: &PlaneTransform,
        boundary: &mut Vec<EdgeId>,
    ) -> Result<VertexId> {
        let world = frame.to_world(p);
        if let Some(v) = self.find_vertex(&world) {
            return Ok(v);
        }
        for i in 0..boundary.len() {
            let (a, b) = self.edge_vertices(boundary[i])?;
            let pa = frame.to_local(&self.vertex_point(a)?);
            let pb = frame.to_local(&self.vertex_point(b)?);
            if point_on_segment(p, &pa, &pb, self.epsilon) {
                let split = self.split_edge(boundary[i], world)?;
                boundary.splice(i..=i, split.edges);
                return Ok(split.vertex);
            }
        }
        Ok(self.add_vertex(world))
    }

    /// Turns edge cycles into loops.
    ///
    /// Each pass resolves what it can and queues the rest for another pass:
    /// dangling edges are pruned, unassigned edges get verges, and verges
    /// only partly used by a cycle are cut where the cycle leaves them. The
    /// loop runs at most `max_iterations` passes. Returns one loop per
    /// candidate, in order; a candidate whose verges match an existing loop
    /// reuses that loop.
    pub fn build_loops_from_edges(
        &mut self,
        candidates: &[Vec<EdgeId>],
        max_iterations: usize,
    ) -> Result<Vec<LoopId>> {
        let mut index: FxHashMap<Vec<VergeId>, LoopId> = self
            .loops
            .iter()
            .map(|(id, l)| (sorted(&l.verges), id))
            .collect();
        let mut resolved: Vec<Option<LoopId>> = vec![None; candidates.len()];
        let mut pending: Vec<(usize, Vec<EdgeId>)> =
            candidates.iter().cloned().enumerate().collect();

        let mut iteration = 0;
        while !pending.is_empty() {
            if iteration == max_iterations {
                return Err(Error::LoopRepairExhausted(max_iterations));
            }
            iteration += 1;

            let mut retry = Vec::new();
            for (i, edges) in pending {
                match self.resolve_loop_candidate(cancel_doubled(edges))? {
                    LoopCandidate::Ready(verges) => {
                        let key = sorted(&verges);
                        let id = match index.get(&key) {
                            Some(&id) => id,
                            None => {
                                let id = self.add_loop(&verges)?;
                                index.insert(key, id);
                                id
                            }
                        };
                        resolved[i] = Some(id);
                    }
                    LoopCandidate::Retry(edges) => retry.push((i, edges)),
                }
            }
            trace!(iteration, retry = retry.len(), "loop repair pass");
            pending = retry;
        }

        resolved
            .into_iter()
            .map(|l| l.ok_or_else(|| Error::OpenLoop("loop candidate was not resolved".into())))
            .collect()
    }

    fn resolve_loop_candidate(&mut self, edges: Vec<EdgeId>) -> Result<LoopCandidate> {
        if edges.is_empty() {
            return Err(Error::OpenLoop("loop candidate has no edges".into()));
        }

        // Dangling edges.
        let mut degree: FxHashMap<VertexId, usize> = FxHashMap::default();
        for &e in &edges {
            let (a, b) = self.edge_vertices(e)?;
            *degree.entry(a).or_default() += 1;
            *degree.entry(b).or_default() += 1;
        }
        let mut pruned = Vec::with_capacity(edges.len());
        for &e in &edges {
            let (a, b) = self.edge_vertices(e)?;
            if degree[&a] > 1 && degree[&b] > 1 {
                pruned.push(e);
            }
        }
        if pruned.len() != edges.len() {
            return Ok(LoopCandidate::Retry(pruned));
        }

        // Unassigned edges.
        let unassigned: Vec<EdgeId> = edges
            .iter()
            .copied()
            .filter(|&e| self.edges.get(e).is_some_and(|ed| ed.parent.is_none()))
            .collect();
        if !unassigned.is_empty() {
            for chain in self.separate_loop_edge_by_merged(&unassigned)? {
                self.add_verge(&chain)?;
            }
            return Ok(LoopCandidate::Retry(edges));
        }

        // Verges the cycle only partly follows.
        let members: FxHashSet<EdgeId> = edges.iter().copied().collect();
        let mut verges: Vec<VergeId> = Vec::new();
        for &e in &edges {
            let v = self.edges.try_get(e)?.parent.ok_or(Error::NotFound(e.into()))?;
            if !verges.contains(&v) {
                verges.push(v);
            }
        }
        let mut cut = false;
        for &v in &verges {
            let verge_edges = self.verges.try_get(v)?.edges.clone();
            if verge_edges.iter().all(|e| members.contains(e)) {
                continue;
            }
            let path = self.verge_vertices(v)?;
            let n = verge_edges.len();
            let cuts: Vec<VertexId> = (0..n)
                .filter(|&k| {
                    let prev = (k + n - 1) % n;
                    members.contains(&verge_edges[prev]) != members.contains(&verge_edges[k])
                })
                .map(|k| path[k])
                .collect();
            self.split_verge(v, &cuts)?;
            cut = true;
        }
        if cut {
            return Ok(LoopCandidate::Retry(edges));
        }

        Ok(LoopCandidate::Ready(verges))
    }
}

fn sorted(verges: &[VergeId]) -> Vec<VergeId> {
    let mut key = verges.to_vec();
    key.sort_unstable();
    key
}

/// Removes every edge listed twice; both traversals cancel out.
fn cancel_doubled(edges: Vec<EdgeId>) -> Vec<EdgeId> {
    let mut count: FxHashMap<EdgeId, usize> = FxHashMap::default();
    for &e in &edges {
        *count.entry(e).or_default() += 1;
    }
    edges.into_iter().filter(|e| count[e] == 1).collect()
}

/// Groups result rings into regions: counter-clockwise rings are outer
/// boundaries, clockwise rings are holes of the smallest outer ring that
/// contains them.
fn group_rings(rings: Vec<Ring>, eps: f64) -> Result<Vec<Region>> {
    let area_eps = eps * eps;
    let mut outers: Vec<(Ring, f64)> = Vec::new();
    let mut holes: Vec<Ring> = Vec::new();
    for ring in rings {
        if !ring.closed {
            return Err(Error::NotTraversable("boolean result has an open chain".into()));
        }
        let area = ring.area();
        if area > area_eps {
            outers.push((ring, area));
        } else if area < -area_eps {
            holes.push(ring);
        }
    }

    let mut regions: Vec<Region> = Vec::with_capacity(outers.len());
    let areas: Vec<f64> = outers.iter().map(|(_, a)| *a).collect();
    for (ring, _) in outers {
        regions.push((ring, Vec::new()));
    }
    for hole in holes {
        let inner = interior_point(&hole.points, eps)
            .ok_or_else(|| Error::DegenerateContour("hole has no interior".into()))?;
        let owner = regions
            .iter()
            .enumerate()
            .filter(|(_, (outer, _))| point_in_polygon(&outer.points, &inner))
            .min_by(|a, b| areas[a.0].total_cmp(&areas[b.0]))
            .map(|(i, _)| i)
            .ok_or_else(|| Error::DegenerateContour("hole lies outside every outer ring".into()))?;
        regions[owner].1.push(hole);
    }
    Ok(regions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use sbrep_geometry::Plane;

    fn square_face(size: f64) -> (SbrepObject, FaceId) {
        let mut obj = SbrepObject::new();
        let v: Vec<VertexId> = [(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)]
            .iter()
            .map(|&(x, y)| obj.add_vertex(Point3::new(x, y, 0.0)))
            .collect();
        let edges: Vec<EdgeId> = (0..4).map(|i| obj.add_edge(v[i], v[(i + 1) % 4]).unwrap()).collect();
        let verge = obj.add_verge(&edges).unwrap();
        let l = obj.add_loop(&[verge]).unwrap();
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::z());
        let f = obj.add_face(0, plane, l, &[]).unwrap();
        (obj, f)
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point3<f64>> {
        vec![
            Point3::new(x0, y0, 0.0),
            Point3::new(x1, y0, 0.0),
            Point3::new(x1, y1, 0.0),
            Point3::new(x0, y1, 0.0),
        ]
    }

    fn check_loops(obj: &SbrepObject) {
        for l in obj.loops().ids() {
            let vertices = obj.closed_contour_vertices(l).unwrap();
            assert_eq!(vertices.len(), obj.loop_edges(l).unwrap().len());
        }
        assert!(obj.feedbacks_consistent());
    }

    #[test]
    fn contained_clip_makes_face_with_hole() {
        let (mut obj, f) = square_face(10.0);
        let result = obj
            .apply_intersect_contour_to_face(f, &rect(2.0, 2.0, 8.0, 8.0), None, &Tolerances::default())
            .unwrap();
        assert_eq!(result.inside.len(), 1);
        assert_eq!(result.outside.len(), 1);
        assert_eq!(obj.face_count(), 2);
        assert_relative_eq!(obj.face_area(result.inside[0]).unwrap(), 36.0, epsilon = 1e-9);
        assert_relative_eq!(obj.face_area(result.outside[0]).unwrap(), 64.0, epsilon = 1e-9);
        assert_eq!(obj.faces().try_get(result.inside[0]).unwrap().group_id, 1);
        let outside = obj.faces().try_get(result.outside[0]).unwrap();
        assert_eq!(outside.group_id, 0);
        assert_eq!(outside.inner_loops.len(), 1);
        check_loops(&obj);
    }

    #[test]
    fn straddling_clip_splits_boundary_edge() {
        let (mut obj, f) = square_face(10.0);
        let result = obj
            .apply_intersect_contour_to_face(f, &rect(8.0, 2.0, 12.0, 4.0), Some(5), &Tolerances::default())
            .unwrap();
        assert_eq!(result.inside.len(), 1);
        assert_eq!(result.outside.len(), 1);
        assert_relative_eq!(obj.face_area(result.inside[0]).unwrap(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(obj.total_area().unwrap(), 100.0, epsilon = 1e-9);
        assert!(obj.find_vertex(&Point3::new(10.0, 2.0, 0.0)).is_some());
        assert!(obj.find_vertex(&Point3::new(10.0, 4.0, 0.0)).is_some());
        // The two faces share the clip boundary inside the square.
        assert_eq!(obj.verge_count(), 3);
        check_loops(&obj);
    }

    #[test]
    fn clip_across_face_gives_two_outside_faces() {
        let (mut obj, f) = square_face(10.0);
        let result = obj
            .apply_intersect_contour_to_face(f, &rect(4.0, -1.0, 6.0, 11.0), None, &Tolerances::default())
            .unwrap();
        assert_eq!(result.inside.len(), 1);
        assert_eq!(result.outside.len(), 2);
        assert_relative_eq!(obj.face_area(result.inside[0]).unwrap(), 20.0, epsilon = 1e-9);
        assert_relative_eq!(obj.total_area().unwrap(), 100.0, epsilon = 1e-9);
        check_loops(&obj);
    }

    #[test]
    fn disjoint_clip_leaves_face_unchanged() {
        let (mut obj, f) = square_face(10.0);
        let result = obj
            .apply_intersect_contour_to_face(f, &rect(20.0, 20.0, 30.0, 30.0), None, &Tolerances::default())
            .unwrap();
        assert_eq!(result, ApplyResult { inside: vec![], outside: vec![f] });
        assert_eq!(obj.face_count(), 1);
        assert_eq!(obj.edge_count(), 4);
    }

    #[test]
    fn covering_clip_regroups_face() {
        let (mut obj, f) = square_face(10.0);
        let result = obj
            .apply_intersect_contour_to_face(f, &rect(-1.0, -1.0, 11.0, 11.0), Some(9), &Tolerances::default())
            .unwrap();
        assert_eq!(result.inside, vec![f]);
        assert_eq!(obj.faces().try_get(f).unwrap().group_id, 9);
    }

    #[test]
    fn degenerate_clip_is_rejected() {
        let (mut obj, f) = square_face(10.0);
        let line = [Point3::new(1.0, 1.0, 0.0), Point3::new(5.0, 5.0, 0.0), Point3::new(9.0, 9.0, 0.0)];
        assert!(matches!(
            obj.apply_intersect_contour_to_face(f, &line, None, &Tolerances::default()),
            Err(Error::DegenerateContour(_))
        ));
    }

    #[test]
    fn projection_uses_face_frame() {
        let (obj, f) = square_face(10.0);
        let pts = obj
            .contour_projection(f, &[Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 4.0, 0.0)])
            .unwrap();
        assert_relative_eq!((pts[1] - pts[0]).norm(), 5.0, epsilon = 1e-12);
    }
}
