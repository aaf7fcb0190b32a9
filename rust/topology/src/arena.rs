// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Arena-based storage for planar B-Rep entities.
//!
//! The [`SbrepObject`] owns every vertex, edge, verge, loop and face in
//! [`IndexedCollection`]s. Downward references (face → loops → verges →
//! edges → vertices) are stored in the owning entity; upward references
//! ("feedbacks") are stored as parent sets on the child and are kept in sync
//! by the mutation primitives in [`construction`](crate::construction).
//!
//! ## Verges
//!
//! A verge is a maximal simple polyline of edges separating exactly two
//! planar regions. Its edges never branch: every vertex touches at most two
//! of them. Loops are cycles of verges, so two faces sharing a boundary
//! share the verge rather than duplicating its edges.

use nalgebra::Point3;
use rustc_hash::{FxHashMap, FxHashSet};
use sbrep_geometry::Plane;
use smallvec::SmallVec;

use crate::collection::IndexedCollection;
use crate::keys::*;

/// A point in 3D space and the edges that use it.
#[derive(Debug, Clone)]
pub struct VertexData {
    pub point: Point3<f64>,
    pub parents: FxHashSet<EdgeId>,
}

/// A segment between two vertices.
#[derive(Debug, Clone)]
pub struct EdgeData {
    pub v1: VertexId,
    pub v2: VertexId,
    /// Owning verge, if the edge has been assigned to one.
    pub parent: Option<VergeId>,
}

impl EdgeData {
    /// The endpoint opposite `v`, if `v` is an endpoint.
    #[inline]
    pub fn other(&self, v: VertexId) -> Option<VertexId> {
        if self.v1 == v {
            Some(self.v2)
        } else if self.v2 == v {
            Some(self.v1)
        } else {
            None
        }
    }

    #[inline]
    pub fn touches(&self, v: VertexId) -> bool {
        self.v1 == v || self.v2 == v
    }
}

/// A simple path or closed chain of edges, stored in walking order.
#[derive(Debug, Clone)]
pub struct VergeData {
    pub edges: Vec<EdgeId>,
    pub parents: FxHashSet<LoopId>,
}

/// A closed cycle of verges.
#[derive(Debug, Clone)]
pub struct LoopData {
    pub verges: Vec<VergeId>,
    pub parents: FxHashSet<FaceId>,
}

/// A planar region bounded by one outer loop and zero or more holes.
#[derive(Debug, Clone)]
pub struct FaceData {
    /// Face group of the source mesh.
    pub group_id: i32,
    pub plane: Plane,
    pub outer_loop: LoopId,
    pub inner_loops: Vec<LoopId>,
}

impl FaceData {
    /// Outer loop followed by the holes.
    pub fn loops(&self) -> impl Iterator<Item = LoopId> + '_ {
        std::iter::once(self.outer_loop).chain(self.inner_loops.iter().copied())
    }
}

/// The planar B-Rep graph.
///
/// # Example
///
/// ```
/// use sbrep_topology::SbrepObject;
/// use nalgebra::Point3;
///
/// let mut obj = SbrepObject::new();
/// let a = obj.add_vertex(Point3::new(0.0, 0.0, 0.0));
/// let b = obj.add_vertex(Point3::new(1.0, 0.0, 0.0));
/// // Coordinates within epsilon resolve to the same vertex.
/// assert_eq!(obj.add_vertex(Point3::new(1.0, 1e-9, 0.0)), b);
/// assert_ne!(a, b);
/// assert_eq!(obj.vertex_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SbrepObject {
    pub(crate) vertices: IndexedCollection<VertexId, VertexData>,
    pub(crate) edges: IndexedCollection<EdgeId, EdgeData>,
    pub(crate) verges: IndexedCollection<VergeId, VergeData>,
    pub(crate) loops: IndexedCollection<LoopId, LoopData>,
    pub(crate) faces: IndexedCollection<FaceId, FaceData>,

    /// Coincidence distance for vertex deduplication.
    pub(crate) epsilon: f64,
    /// Uniform grid over vertex positions, cell size `epsilon`.
    pub(crate) vertex_grid: FxHashMap<[i64; 3], SmallVec<[VertexId; 2]>>,
}

impl SbrepObject {
    /// Creates an empty object with the default tolerance.
    pub fn new() -> Self {
        Self::with_epsilon(crate::config::Tolerances::default().epsilon)
    }

    /// Creates an empty object with the given coincidence distance.
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self {
            vertices: IndexedCollection::new(),
            edges: IndexedCollection::new(),
            verges: IndexedCollection::new(),
            loops: IndexedCollection::new(),
            faces: IndexedCollection::new(),
            epsilon,
            vertex_grid: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    // --- Collections ---

    #[inline]
    pub fn vertices(&self) -> &IndexedCollection<VertexId, VertexData> {
        &self.vertices
    }

    #[inline]
    pub fn edges(&self) -> &IndexedCollection<EdgeId, EdgeData> {
        &self.edges
    }

    #[inline]
    pub fn verges(&self) -> &IndexedCollection<VergeId, VergeData> {
        &self.verges
    }

    #[inline]
    pub fn loops(&self) -> &IndexedCollection<LoopId, LoopData> {
        &self.loops
    }

    #[inline]
    pub fn faces(&self) -> &IndexedCollection<FaceId, FaceData> {
        &self.faces
    }

    // --- Counts ---

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn verge_count(&self) -> usize {
        self.verges.len()
    }

    pub fn loop_count(&self) -> usize {
        self.loops.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// `true` if the object holds no entities at all.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
            && self.edges.is_empty()
            && self.verges.is_empty()
            && self.loops.is_empty()
            && self.faces.is_empty()
    }

    /// Returns `true` if the given key references a live entity.
    pub fn contains(&self, key: TopologyKey) -> bool {
        match key {
            TopologyKey::Vertex(id) => self.vertices.contains(id),
            TopologyKey::Edge(id) => self.edges.contains(id),
            TopologyKey::Verge(id) => self.verges.contains(id),
            TopologyKey::Loop(id) => self.loops.contains(id),
            TopologyKey::Face(id) => self.faces.contains(id),
        }
    }

    // --- Vertex grid helpers ---

    #[inline]
    pub(crate) fn grid_cell(&self, p: &Point3<f64>) -> [i64; 3] {
        let size = self.epsilon.max(1e-12);
        [
            (p.x / size).floor() as i64,
            (p.y / size).floor() as i64,
            (p.z / size).floor() as i64,
        ]
    }

    pub(crate) fn grid_insert(&mut self, id: VertexId, p: &Point3<f64>) {
        let cell = self.grid_cell(p);
        self.vertex_grid.entry(cell).or_default().push(id);
    }

    pub(crate) fn grid_remove(&mut self, id: VertexId, p: &Point3<f64>) {
        let cell = self.grid_cell(p);
        if let Some(bucket) = self.vertex_grid.get_mut(&cell) {
            bucket.retain(|v| *v != id);
            if bucket.is_empty() {
                self.vertex_grid.remove(&cell);
            }
        }
    }

    /// Finds an existing vertex within `epsilon` of `p`, the nearest if
    /// several qualify.
    pub fn find_vertex(&self, p: &Point3<f64>) -> Option<VertexId> {
        let [cx, cy, cz] = self.grid_cell(p);
        let mut best: Option<(VertexId, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.vertex_grid.get(&[cx + dx, cy + dy, cz + dz]) else {
                        continue;
                    };
                    for &id in bucket {
                        let Some(v) = self.vertices.get(id) else {
                            continue;
                        };
                        let d = (v.point - p).norm();
                        if d <= self.epsilon && best.map_or(true, |(_, bd)| d < bd) {
                            best = Some((id, d));
                        }
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }
}

impl Default for SbrepObject {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_object_is_empty() {
        let obj = SbrepObject::new();
        assert!(obj.is_empty());
        assert_eq!(obj.vertex_count(), 0);
        assert_eq!(obj.edge_count(), 0);
        assert_eq!(obj.verge_count(), 0);
        assert_eq!(obj.loop_count(), 0);
        assert_eq!(obj.face_count(), 0);
    }

    #[test]
    fn find_vertex_across_grid_cells() {
        let mut obj = SbrepObject::with_epsilon(0.1);
        let v = obj.add_vertex(Point3::new(0.199, 0.0, 0.0));
        // Neighbouring cell, still within epsilon.
        assert_eq!(obj.find_vertex(&Point3::new(0.21, 0.0, 0.0)), Some(v));
        assert_eq!(obj.find_vertex(&Point3::new(0.35, 0.0, 0.0)), None);
    }

    #[test]
    fn contains_check() {
        let mut obj = SbrepObject::new();
        let v = obj.add_vertex(Point3::origin());
        assert!(obj.contains(TopologyKey::Vertex(v)));
        assert!(!obj.contains(TopologyKey::Edge(EdgeId(1))));
    }
}
