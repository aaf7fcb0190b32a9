// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Traversal of the B-Rep hierarchy.
//!
//! Downward walks (face → loops → verges → edges → vertices) follow the
//! stored child lists; upward queries (vertex → edges → verge → loops →
//! faces) follow the parent sets.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::arena::SbrepObject;
use crate::error::{Error, Result};
use crate::keys::*;

type Incidence = FxHashMap<VertexId, SmallVec<[usize; 2]>>;

// =============================================================================
// Downward traversal
// =============================================================================

impl SbrepObject {
    /// Returns the two vertices of an edge.
    pub fn edge_vertices(&self, id: EdgeId) -> Result<(VertexId, VertexId)> {
        let e = self.edges.try_get(id)?;
        Ok((e.v1, e.v2))
    }

    /// Vertices of a verge in walking order, one more than its edge count.
    /// For a closed verge the first and last entries are equal.
    pub fn verge_vertices(&self, id: VergeId) -> Result<Vec<VertexId>> {
        let edges = &self.verges.try_get(id)?.edges;
        let Some(&first) = edges.first() else {
            return Ok(Vec::new());
        };
        let e0 = self.edges.try_get(first)?;
        let start = match edges.get(1) {
            Some(&second) => {
                let e1 = self.edges.try_get(second)?;
                if e1.touches(e0.v2) && !(edges.len() == 2 && e1.touches(e0.v1)) {
                    e0.v1
                } else {
                    e0.v2
                }
            }
            None => e0.v1,
        };

        let mut path = Vec::with_capacity(edges.len() + 1);
        path.push(start);
        let mut current = start;
        for &e in edges {
            current = self
                .edges
                .try_get(e)?
                .other(current)
                .ok_or(Error::DisconnectedVerge)?;
            path.push(current);
        }
        Ok(path)
    }

    /// End vertices of an open verge, `None` for a closed one.
    pub fn verge_endpoints(&self, id: VergeId) -> Result<Option<(VertexId, VertexId)>> {
        let path = self.verge_vertices(id)?;
        match (path.first(), path.last()) {
            (Some(a), Some(b)) if a != b => Ok(Some((*a, *b))),
            _ => Ok(None),
        }
    }

    /// All edges of a loop, verge by verge.
    pub fn loop_edges(&self, id: LoopId) -> Result<Vec<EdgeId>> {
        let mut edges = Vec::new();
        for &v in &self.loops.try_get(id)?.verges {
            edges.extend_from_slice(&self.verges.try_get(v)?.edges);
        }
        Ok(edges)
    }

    /// Walks a loop vertex to vertex.
    ///
    /// Returns exactly one vertex per edge, starting at the first vertex of
    /// the first edge; the walk ends back at the start. Fails with
    /// [`Error::NotTraversable`] if the edges are not a single closed,
    /// non-branching cycle.
    pub fn closed_contour_vertices(&self, id: LoopId) -> Result<Vec<VertexId>> {
        let edges = self.loop_edges(id)?;
        self.cycle_vertices(&edges)
    }

    /// Loops of a face, outer first.
    pub fn face_loops(&self, id: FaceId) -> Result<Vec<LoopId>> {
        Ok(self.faces.try_get(id)?.loops().collect())
    }

    /// Unique edges of a face, in loop order.
    pub fn face_edges(&self, id: FaceId) -> Result<Vec<EdgeId>> {
        let mut seen = FxHashSet::default();
        let mut edges = Vec::new();
        for l in self.face_loops(id)? {
            for e in self.loop_edges(l)? {
                if seen.insert(e) {
                    edges.push(e);
                }
            }
        }
        Ok(edges)
    }

    /// Unique vertices of a face, in loop order.
    pub fn face_vertices(&self, id: FaceId) -> Result<Vec<VertexId>> {
        let mut seen = FxHashSet::default();
        let mut vertices = Vec::new();
        for l in self.face_loops(id)? {
            for v in self.closed_contour_vertices(l)? {
                if seen.insert(v) {
                    vertices.push(v);
                }
            }
        }
        Ok(vertices)
    }

    // =========================================================================
    // Upward traversal
    // =========================================================================

    /// Edges using a vertex, sorted by ID.
    pub fn vertex_edges(&self, id: VertexId) -> Result<Vec<EdgeId>> {
        let mut edges: Vec<EdgeId> = self.vertices.try_get(id)?.parents.iter().copied().collect();
        edges.sort_unstable();
        Ok(edges)
    }

    /// Faces bounded by an edge, sorted by ID.
    pub fn edge_faces(&self, id: EdgeId) -> Result<Vec<FaceId>> {
        let Some(verge) = self.edges.try_get(id)?.parent else {
            return Ok(Vec::new());
        };
        let mut faces = FxHashSet::default();
        for &l in &self.verges.try_get(verge)?.parents {
            faces.extend(self.loops.try_get(l)?.parents.iter().copied());
        }
        let mut faces: Vec<FaceId> = faces.into_iter().collect();
        faces.sort_unstable();
        Ok(faces)
    }

    /// Faces sharing at least one verge with `id`, sorted by ID.
    pub fn neighbour_faces(&self, id: FaceId) -> Result<Vec<FaceId>> {
        let mut faces = FxHashSet::default();
        for l in self.face_loops(id)? {
            for &v in &self.loops.try_get(l)?.verges {
                for &pl in &self.verges.try_get(v)?.parents {
                    faces.extend(self.loops.try_get(pl)?.parents.iter().copied());
                }
            }
        }
        faces.remove(&id);
        let mut faces: Vec<FaceId> = faces.into_iter().collect();
        faces.sort_unstable();
        Ok(faces)
    }

    // =========================================================================
    // Edge-set walks
    // =========================================================================

    fn incidence(&self, edges: &[EdgeId]) -> Result<Incidence> {
        let mut incident: Incidence = FxHashMap::default();
        for (i, &e) in edges.iter().enumerate() {
            let edge = self.edges.try_get(e)?;
            incident.entry(edge.v1).or_default().push(i);
            incident.entry(edge.v2).or_default().push(i);
        }
        Ok(incident)
    }

    /// Orders edges into one simple path or closed chain.
    pub(crate) fn chain_order(&self, edges: &[EdgeId]) -> Result<Vec<EdgeId>> {
        if edges.is_empty() {
            return Err(Error::DisconnectedVerge);
        }
        let incident = self.incidence(edges)?;

        let mut start = None;
        for &e in edges {
            let edge = self.edges.try_get(e)?;
            for v in [edge.v1, edge.v2] {
                let degree = incident[&v].len();
                if degree > 2 {
                    return Err(Error::BranchingVerge(v));
                }
                if degree == 1 && start.is_none() {
                    start = Some(v);
                }
            }
        }
        let start = match start {
            Some(v) => v,
            None => self.edges.try_get(edges[0])?.v1,
        };

        let mut used = vec![false; edges.len()];
        let mut ordered = Vec::with_capacity(edges.len());
        let mut current = start;
        while let Some(&i) = incident[&current].iter().find(|&&i| !used[i]) {
            used[i] = true;
            ordered.push(edges[i]);
            current = self
                .edges
                .try_get(edges[i])?
                .other(current)
                .ok_or(Error::DisconnectedVerge)?;
        }

        if ordered.len() != edges.len() {
            return Err(Error::DisconnectedVerge);
        }
        Ok(ordered)
    }

    /// Walks a closed cycle of edges, one vertex per edge.
    pub(crate) fn cycle_vertices(&self, edges: &[EdgeId]) -> Result<Vec<VertexId>> {
        let Some(&first) = edges.first() else {
            return Err(Error::NotTraversable("empty edge set".into()));
        };
        let incident = self.incidence(edges)?;
        if let Some((v, list)) = incident.iter().find(|(_, list)| list.len() != 2) {
            return Err(Error::NotTraversable(format!(
                "vertex {v} has degree {} in the cycle",
                list.len()
            )));
        }

        let first_edge = self.edges.try_get(first)?;
        let start = first_edge.v1;
        let mut used = vec![false; edges.len()];
        used[0] = true;
        let mut vertices = Vec::with_capacity(edges.len());
        vertices.push(start);
        let mut current = first_edge.v2;

        while current != start {
            vertices.push(current);
            let next = incident[&current]
                .iter()
                .copied()
                .find(|&i| !used[i])
                .ok_or_else(|| Error::NotTraversable(format!("walk dead-ends at vertex {current}")))?;
            used[next] = true;
            current = self
                .edges
                .try_get(edges[next])?
                .other(current)
                .ok_or_else(|| Error::NotTraversable(format!("edge {} is detached", edges[next])))?;
        }

        if vertices.len() != edges.len() {
            return Err(Error::NotTraversable(format!(
                "walk closed after {} of {} edges",
                vertices.len(),
                edges.len()
            )));
        }
        Ok(vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Point3, Vector3};
    use sbrep_geometry::Plane;

    /// Two unit squares side by side sharing the edge x = 1.
    fn two_squares() -> (SbrepObject, [FaceId; 2]) {
        let mut obj = SbrepObject::new();
        let p = |x: f64, y: f64| Point3::new(x, y, 0.0);
        let v: Vec<VertexId> = [p(0., 0.), p(1., 0.), p(2., 0.), p(2., 1.), p(1., 1.), p(0., 1.)]
            .into_iter()
            .map(|q| obj.add_vertex(q))
            .collect();
        let e = |obj: &mut SbrepObject, a: usize, b: usize| obj.add_edge(v[a], v[b]).unwrap();
        let shared = e(&mut obj, 1, 4);
        let left = [e(&mut obj, 4, 5), e(&mut obj, 5, 0), e(&mut obj, 0, 1)];
        let right = [e(&mut obj, 1, 2), e(&mut obj, 2, 3), e(&mut obj, 3, 4)];

        let shared = obj.add_verge(&[shared]).unwrap();
        let left = obj.add_verge(&left).unwrap();
        let right = obj.add_verge(&right).unwrap();
        let l0 = obj.add_loop(&[shared, left]).unwrap();
        let l1 = obj.add_loop(&[shared, right]).unwrap();
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::z());
        let f0 = obj.add_face(0, plane, l0, &[]).unwrap();
        let f1 = obj.add_face(0, plane, l1, &[]).unwrap();
        (obj, [f0, f1])
    }

    #[test]
    fn closed_contour_visits_each_edge_once() {
        let (obj, [f0, _]) = two_squares();
        let l = obj.faces().try_get(f0).unwrap().outer_loop;
        let vertices = obj.closed_contour_vertices(l).unwrap();
        assert_eq!(vertices.len(), obj.loop_edges(l).unwrap().len());
        let unique: FxHashSet<_> = vertices.iter().collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn open_verge_endpoints() {
        let (obj, _) = two_squares();
        let verge = VergeId(2);
        let (a, b) = obj.verge_endpoints(verge).unwrap().unwrap();
        assert_eq!(obj.verge_vertices(verge).unwrap().len(), 4);
        assert_ne!(a, b);
    }

    #[test]
    fn neighbours_through_shared_verge() {
        let (obj, [f0, f1]) = two_squares();
        assert_eq!(obj.neighbour_faces(f0).unwrap(), vec![f1]);
        assert_eq!(obj.edge_faces(EdgeId(1)).unwrap(), vec![f0, f1]);
        assert_eq!(obj.edge_faces(EdgeId(2)).unwrap(), vec![f0]);
        assert_eq!(obj.face_vertices(f1).unwrap().len(), 4);
        assert_eq!(obj.face_edges(f1).unwrap().len(), 4);
    }

    #[test]
    fn branching_cycle_is_not_traversable() {
        let (obj, _) = two_squares();
        let all: Vec<EdgeId> = obj.edges().ids().collect();
        assert!(matches!(obj.cycle_vertices(&all), Err(Error::NotTraversable(_))));
    }
}
