// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mutation primitives.
//!
//! Every primitive validates the IDs it is handed and keeps the parent sets
//! of the affected children in sync, so the feedback fixpoint holds after
//! each call. Removal always detaches the entity from both its children and
//! its parents.

use nalgebra::Point3;
use rustc_hash::FxHashSet;
use sbrep_geometry::Plane;

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

/// Result of [`SbrepObject::split_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSplit {
    /// Vertex inserted on the edge.
    pub vertex: VertexId,
    /// The two halves, in the walking order of the owning verge.
    pub edges: [EdgeId; 2],
}

impl SbrepObject {
    // --- Vertices ---

    /// Adds a vertex, or returns the existing vertex within `epsilon`.
    pub fn add_vertex(&mut self, point: Point3<f64>) -> VertexId {
        if let Some(id) = self.find_vertex(&point) {
            return id;
        }
        let id = self.vertices.insert(VertexData {
            point,
            parents: FxHashSet::default(),
        });
        self.grid_insert(id, &point);
        id
    }

    /// Removes every vertex no edge refers to. Returns how many were removed.
    pub fn remove_unused_vertices(&mut self) -> usize {
        let unused: Vec<(VertexId, Point3<f64>)> = self
            .vertices
            .iter()
            .filter(|(_, v)| v.parents.is_empty())
            .map(|(id, v)| (id, v.point))
            .collect();
        for (id, point) in &unused {
            self.vertices.remove(*id);
            self.grid_remove(*id, point);
        }
        unused.len()
    }

    // --- Edges ---

    /// Returns the edge joining `a` and `b` in either direction.
    pub fn find_edge(&self, a: VertexId, b: VertexId) -> Option<EdgeId> {
        let va = self.vertices.get(a)?;
        va.parents.iter().copied().find(|&e| {
            self.edges
                .get(e)
                .is_some_and(|edge| edge.other(a) == Some(b))
        })
    }

    /// Creates an edge between two existing vertices, or returns the edge
    /// that already joins them.
    pub fn add_edge(&mut self, v1: VertexId, v2: VertexId) -> Result<EdgeId> {
        self.vertices.try_get(v1)?;
        self.vertices.try_get(v2)?;
        if v1 == v2 {
            return Err(Error::DegenerateEdge(v1));
        }
        if let Some(existing) = self.find_edge(v1, v2) {
            return Ok(existing);
        }

        let id = self.edges.insert(EdgeData {
            v1,
            v2,
            parent: None,
        });
        self.vertices.try_get_mut(v1)?.parents.insert(id);
        self.vertices.try_get_mut(v2)?.parents.insert(id);
        Ok(id)
    }

    /// Removes an edge from its vertices and from its verge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<EdgeData> {
        let data = self.edges.remove(id).ok_or(Error::NotFound(id.into()))?;
        for v in [data.v1, data.v2] {
            if let Some(vertex) = self.vertices.get_mut(v) {
                vertex.parents.remove(&id);
            }
        }
        if let Some(verge) = data.parent.and_then(|p| self.verges.get_mut(p)) {
            verge.edges.retain(|&e| e != id);
        }
        Ok(data)
    }

    /// Inserts a vertex at `point` on edge `id`, replacing the edge by two
    /// halves. The halves take the edge's place in its verge.
    pub fn split_edge(&mut self, id: EdgeId, point: Point3<f64>) -> Result<EdgeSplit> {
        let edge = self.edges.try_get(id)?.clone();
        let mid = self.add_vertex(point);
        if edge.touches(mid) {
            return Err(Error::DegenerateEdge(mid));
        }

        // Walking direction through the edge inside its verge.
        let (entry, position) = match edge.parent {
            Some(verge) => {
                let edges = &self.verges.try_get(verge)?.edges;
                let pos = edges
                    .iter()
                    .position(|&e| e == id)
                    .ok_or(Error::NotFound(id.into()))?;
                (self.entry_vertex(edges, pos)?, Some((verge, pos)))
            }
            None => (edge.v1, None),
        };
        let exit = edge.other(entry).ok_or(Error::NotFound(entry.into()))?;

        let first = self.add_edge(entry, mid)?;
        let second = self.add_edge(mid, exit)?;
        for half in [first, second] {
            if let Some(verge) = self.edges.try_get(half)?.parent {
                return Err(Error::EdgeAlreadyAssigned { edge: half, verge });
            }
        }

        if let Some((verge, pos)) = position {
            self.verges
                .try_get_mut(verge)?
                .edges
                .splice(pos..=pos, [first, second]);
            self.edges.try_get_mut(first)?.parent = Some(verge);
            self.edges.try_get_mut(second)?.parent = Some(verge);
        }
        self.remove_edge(id)?;

        Ok(EdgeSplit {
            vertex: mid,
            edges: [first, second],
        })
    }

    /// Vertex through which the walk of `edges` enters `edges[pos]`.
    fn entry_vertex(&self, edges: &[EdgeId], pos: usize) -> Result<VertexId> {
        let edge = self.edges.try_get(edges[pos])?;
        if edges.len() == 1 {
            return Ok(edge.v1);
        }
        let closed = edges.len() > 2 && self.shares_vertex(edges[0], edges[edges.len() - 1])?;
        if pos > 0 || closed {
            let prev = self.edges.try_get(edges[(pos + edges.len() - 1) % edges.len()])?;
            if prev.touches(edge.v1) {
                return Ok(edge.v1);
            }
            return Ok(edge.v2);
        }
        let next = self.edges.try_get(edges[1])?;
        Ok(if next.touches(edge.v1) { edge.v2 } else { edge.v1 })
    }

    fn shares_vertex(&self, a: EdgeId, b: EdgeId) -> Result<bool> {
        let ea = self.edges.try_get(a)?;
        let eb = self.edges.try_get(b)?;
        Ok(eb.touches(ea.v1) || eb.touches(ea.v2))
    }

    // --- Verges ---

    /// Creates a verge from unassigned edges forming one simple path or one
    /// closed chain. The edges are stored in walking order.
    pub fn add_verge(&mut self, edges: &[EdgeId]) -> Result<VergeId> {
        for &e in edges {
            if let Some(verge) = self.edges.try_get(e)?.parent {
                return Err(Error::EdgeAlreadyAssigned { edge: e, verge });
            }
        }
        let ordered = self.chain_order(edges)?;

        let id = self.verges.insert(VergeData {
            edges: ordered,
            parents: FxHashSet::default(),
        });
        for &e in edges {
            self.edges.try_get_mut(e)?.parent = Some(id);
        }
        Ok(id)
    }

    /// Removes a verge, releasing its edges and dropping it from its loops.
    pub fn remove_verge(&mut self, id: VergeId) -> Result<VergeData> {
        let data = self.verges.remove(id).ok_or(Error::NotFound(id.into()))?;
        for &e in &data.edges {
            if let Some(edge) = self.edges.get_mut(e) {
                if edge.parent == Some(id) {
                    edge.parent = None;
                }
            }
        }
        for &l in &data.parents {
            if let Some(lp) = self.loops.get_mut(l) {
                lp.verges.retain(|&v| v != id);
            }
        }
        Ok(data)
    }

    /// Cuts a verge at the given vertices.
    ///
    /// An open verge is cut at each listed interior vertex; its endpoints are
    /// ignored. A closed verge needs two cuts to fall apart; with a single
    /// cut it is only rotated to start at that vertex. The pieces replace the
    /// verge in every parent loop. Returns the pieces in walking order (just
    /// `[id]` when nothing was cut).
    pub fn split_verge(&mut self, id: VergeId, at: &[VertexId]) -> Result<Vec<VergeId>> {
        let path = self.verge_vertices(id)?;
        let closed = path.len() > 2 && path.first() == path.last();
        let cuts: Vec<usize> = if closed {
            (0..path.len() - 1).filter(|&k| at.contains(&path[k])).collect()
        } else {
            (1..path.len() - 1).filter(|&k| at.contains(&path[k])).collect()
        };
        if cuts.is_empty() {
            return Ok(vec![id]);
        }

        let mut edges = self.verges.try_get(id)?.edges.clone();
        let mut cuts = cuts;
        if closed {
            let shift = cuts[0];
            edges.rotate_left(shift);
            cuts = cuts.iter().map(|&k| k - shift).collect();
            if cuts.len() == 1 {
                self.verges.try_get_mut(id)?.edges = edges;
                return Ok(vec![id]);
            }
            cuts.remove(0);
        }

        let mut pieces: Vec<Vec<EdgeId>> = Vec::with_capacity(cuts.len() + 1);
        let mut start = 0;
        for &k in &cuts {
            pieces.push(edges[start..k].to_vec());
            start = k;
        }
        pieces.push(edges[start..].to_vec());

        let parents = self.verges.try_get(id)?.parents.clone();
        self.verges.remove(id);

        let mut ids = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let piece_id = self.verges.insert(VergeData {
                edges: piece.clone(),
                parents: parents.clone(),
            });
            for e in piece {
                self.edges.try_get_mut(e)?.parent = Some(piece_id);
            }
            ids.push(piece_id);
        }

        for &l in &parents {
            let lp = self.loops.try_get_mut(l)?;
            if let Some(pos) = lp.verges.iter().position(|&v| v == id) {
                lp.verges.splice(pos..=pos, ids.iter().copied());
            }
        }

        tracing::trace!(verge = %id, pieces = ids.len(), "split verge");
        Ok(ids)
    }

    // --- Loops ---

    /// Creates a loop from verges whose edges form one closed,
    /// non-branching cycle.
    pub fn add_loop(&mut self, verges: &[VergeId]) -> Result<LoopId> {
        if verges.is_empty() {
            return Err(Error::OpenLoop("loop has no verges".into()));
        }
        let mut edges = Vec::new();
        for &v in verges {
            edges.extend_from_slice(&self.verges.try_get(v)?.edges);
        }
        self.cycle_vertices(&edges)
            .map_err(|e| Error::OpenLoop(e.to_string()))?;

        let id = self.loops.insert(LoopData {
            verges: verges.to_vec(),
            parents: FxHashSet::default(),
        });
        for &v in verges {
            self.verges.try_get_mut(v)?.parents.insert(id);
        }
        Ok(id)
    }

    /// Removes a loop. Fails if it is still the outer loop of a face.
    pub fn remove_loop(&mut self, id: LoopId) -> Result<LoopData> {
        let data = self.loops.try_get(id)?;
        for &f in &data.parents {
            if self.faces.get(f).is_some_and(|face| face.outer_loop == id) {
                return Err(Error::LoopInUse { loop_id: id, face: f });
            }
        }

        let data = self.loops.remove(id).ok_or(Error::NotFound(id.into()))?;
        for &f in &data.parents {
            if let Some(face) = self.faces.get_mut(f) {
                face.inner_loops.retain(|&l| l != id);
            }
        }
        for &v in &data.verges {
            if let Some(verge) = self.verges.get_mut(v) {
                verge.parents.remove(&id);
            }
        }
        Ok(data)
    }

    // --- Faces ---

    /// Creates a face from an outer loop and holes.
    pub fn add_face(
        &mut self,
        group_id: i32,
        plane: Plane,
        outer_loop: LoopId,
        inner_loops: &[LoopId],
    ) -> Result<FaceId> {
        self.loops.try_get(outer_loop)?;
        for &l in inner_loops {
            self.loops.try_get(l)?;
        }

        let id = self.faces.insert(FaceData {
            group_id,
            plane,
            outer_loop,
            inner_loops: inner_loops.to_vec(),
        });
        for l in std::iter::once(outer_loop).chain(inner_loops.iter().copied()) {
            self.loops.try_get_mut(l)?.parents.insert(id);
        }
        Ok(id)
    }

    /// Removes a face and detaches it from its loops.
    pub fn remove_face(&mut self, id: FaceId) -> Result<FaceData> {
        let data = self.faces.remove(id).ok_or(Error::NotFound(id.into()))?;
        for l in data.loops() {
            if let Some(lp) = self.loops.get_mut(l) {
                lp.parents.remove(&id);
            }
        }
        Ok(data)
    }

    /// Highest face group ID in use, if any face exists.
    pub fn max_group_id(&self) -> Option<i32> {
        self.faces.values().map(|f| f.group_id).max()
    }
}
