// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh → B-Rep construction.
//!
//! 1. Triangles are bucketed by rounded normal.
//! 2. A flood fill over edge adjacency splits every bucket into planar
//!    groups; triangles with different mesh group IDs never share a group.
//! 3. Edges between two different planar groups (or between a group and the
//!    open mesh border) are boundary edges.
//! 4. Boundary edges separating the same pair of groups are chained into
//!    verges, cut at black points (vertices where more than two boundary
//!    edges meet).
//! 5. Each group's boundary loops are mapped onto verges; loops with the same
//!    verge set are shared between groups.
//! 6. One face per group; the largest loop becomes its outer loop.

use std::collections::{BTreeMap, VecDeque};

use nalgebra::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};
use sbrep_geometry::{Mesh, MeshTopology, Plane};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::arena::SbrepObject;
use crate::config::Tolerances;
use crate::error::{Error, Result};
use crate::keys::*;

/// Side of a boundary edge: a planar group index, or `None` for the open
/// mesh border.
type Side = Option<usize>;

/// A maximal connected set of triangles sharing a normal and a mesh group.
#[derive(Debug, Clone)]
pub struct PlanarGroup {
    pub triangles: Vec<u32>,
    /// Area-weighted unit normal.
    pub normal: Vector3<f64>,
    /// Face group ID of the source triangles.
    pub mesh_group: i32,
}

/// Output of [`SbrepBuilder::build_loops`]: an object holding vertices,
/// edges, verges and loops, but no faces yet.
#[derive(Debug, Clone)]
pub struct LoopBuild {
    pub object: SbrepObject,
    pub groups: Vec<PlanarGroup>,
    /// Loops of each planar group, parallel to `groups`.
    pub group_loops: Vec<Vec<LoopId>>,
}

/// Builds an [`SbrepObject`] from a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct SbrepBuilder {
    tolerances: Tolerances,
}

impl SbrepBuilder {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }

    pub fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    /// Converts a mesh. An empty mesh gives an empty object.
    pub fn convert(&self, mesh: &Mesh) -> Result<SbrepObject> {
        if mesh.is_empty() {
            return Ok(SbrepObject::with_epsilon(self.tolerances.epsilon));
        }

        let LoopBuild {
            mut object,
            groups,
            group_loops,
        } = self.build_loops(mesh)?;

        for (i, (group, loops)) in groups.iter().zip(&group_loops).enumerate() {
            let (outer, inner) = loops.split_first().ok_or(Error::GroupIntegrity(i))?;
            let anchor = mesh.triangle_points(group.triangles[0] as usize)[0];
            let plane = Plane::from_point_normal(&anchor, &group.normal);
            object.add_face(group.mesh_group, plane, *outer, inner)?;
        }

        object.define_faces_outside_loop()?;
        object.redefine_feedbacks();

        info!(
            triangles = mesh.triangle_count(),
            vertices = object.vertex_count(),
            edges = object.edge_count(),
            verges = object.verge_count(),
            loops = object.loop_count(),
            faces = object.face_count(),
            "built B-Rep from mesh"
        );
        Ok(object)
    }

    /// Runs construction up to loop extraction (steps 1–5).
    pub fn build_loops(&self, mesh: &Mesh) -> Result<LoopBuild> {
        let topo = MeshTopology::build(mesh)?;
        let buckets = self.bucket_normals(mesh);
        let (groups, group_of) = self.planar_groups(mesh, &topo, &buckets);
        debug!(
            triangles = mesh.triangle_count(),
            buckets = buckets.iter().max().map_or(0, |b| b + 1),
            groups = groups.len(),
            "planar groups"
        );

        // Boundary edges keyed by the (ordered) pair of sides they separate.
        let mut boundary: Vec<(u32, (Side, Side))> = Vec::new();
        let mut has_boundary = vec![false; groups.len()];
        for (e, edge) in topo.edges() {
            let sides = edge.triangles.map(|t| t.map(|t| group_of[t as usize]));
            if sides[0].is_none() && sides[1].is_none() {
                return Err(Error::OpenMesh(edge.vertices[0], edge.vertices[1]));
            }
            if sides[0] == sides[1] {
                continue;
            }
            for g in sides.into_iter().flatten() {
                has_boundary[g] = true;
            }
            let pair = if sides[0] <= sides[1] {
                (sides[0], sides[1])
            } else {
                (sides[1], sides[0])
            };
            boundary.push((e, pair));
        }
        if let Some(g) = has_boundary.iter().position(|b| !b) {
            return Err(Error::GroupIntegrity(g));
        }

        let mut object = SbrepObject::with_epsilon(self.tolerances.epsilon);
        let mut vertex_map: FxHashMap<u32, VertexId> = FxHashMap::default();
        let mut edge_map: FxHashMap<u32, EdgeId> = FxHashMap::default();
        let mut by_pair: BTreeMap<(Side, Side), Vec<EdgeId>> = BTreeMap::new();

        for &(e, pair) in &boundary {
            let [a, b] = topo.edge(e).vertices;
            let va = *vertex_map
                .entry(a)
                .or_insert_with(|| object.add_vertex(mesh.positions[a as usize]));
            let vb = *vertex_map
                .entry(b)
                .or_insert_with(|| object.add_vertex(mesh.positions[b as usize]));
            let id = object.add_edge(va, vb)?;
            edge_map.insert(e, id);
            by_pair.entry(pair).or_default().push(id);
        }

        for edges in by_pair.values() {
            for chain in object.separate_loop_edge_by_merged(edges)? {
                object.add_verge(&chain)?;
            }
        }
        debug!(
            boundary_edges = boundary.len(),
            verges = object.verge_count(),
            "merged boundary edges into verges"
        );

        let mut loop_index: FxHashMap<Vec<VergeId>, LoopId> = FxHashMap::default();
        let mut group_loops = vec![Vec::new(); groups.len()];
        for (g, group) in groups.iter().enumerate() {
            for mesh_loop in topo.region_boundary_loops(mesh, &group.triangles, &group.normal)? {
                let mut verges = Vec::new();
                let mut seen = FxHashSet::default();
                for me in mesh_loop {
                    let e = edge_map.get(&me).copied().ok_or(Error::GroupIntegrity(g))?;
                    let verge = object.edges().try_get(e)?.parent.ok_or(Error::GroupIntegrity(g))?;
                    if seen.insert(verge) {
                        verges.push(verge);
                    }
                }

                let mut key = verges.clone();
                key.sort_unstable();
                let id = match loop_index.get(&key) {
                    Some(&id) => id,
                    None => {
                        let id = object.add_loop(&verges)?;
                        loop_index.insert(key, id);
                        id
                    }
                };
                group_loops[g].push(id);
            }
            if group_loops[g].is_empty() {
                return Err(Error::GroupIntegrity(g));
            }
        }

        Ok(LoopBuild {
            object,
            groups,
            group_loops,
        })
    }

    /// Assigns each triangle a normal bucket index.
    ///
    /// Normals are rounded to `normal_digits` decimals and compared
    /// component-wise with `normal_epsilon` against each bucket's
    /// representative.
    pub fn bucket_normals(&self, mesh: &Mesh) -> Vec<usize> {
        let scale = 10f64.powi(self.tolerances.normal_digits as i32);
        let mut exact: FxHashMap<[i64; 3], usize> = FxHashMap::default();
        let mut representatives: Vec<Vector3<f64>> = Vec::new();

        (0..mesh.triangle_count())
            .map(|t| {
                let n = self.tolerances.round_normal(&mesh.triangle_normal(t));
                let key = [
                    (n.x * scale).round() as i64,
                    (n.y * scale).round() as i64,
                    (n.z * scale).round() as i64,
                ];
                if let Some(&b) = exact.get(&key) {
                    return b;
                }
                let b = representatives
                    .iter()
                    .position(|r| self.tolerances.normals_equal(r, &n))
                    .unwrap_or_else(|| {
                        representatives.push(n);
                        representatives.len() - 1
                    });
                exact.insert(key, b);
                b
            })
            .collect()
    }

    /// Flood-fills triangle adjacency inside each normal bucket and mesh
    /// group. Returns the groups and the group index of every triangle.
    pub fn planar_groups(
        &self,
        mesh: &Mesh,
        topo: &MeshTopology,
        buckets: &[usize],
    ) -> (Vec<PlanarGroup>, Vec<usize>) {
        const UNASSIGNED: usize = usize::MAX;
        let mut group_of = vec![UNASSIGNED; mesh.triangle_count()];
        let mut groups = Vec::new();
        let mut queue = VecDeque::new();

        for seed in 0..mesh.triangle_count() {
            if group_of[seed] != UNASSIGNED {
                continue;
            }
            let g = groups.len();
            let bucket = buckets[seed];
            let mesh_group = mesh.triangle_group(seed);
            let mut triangles = Vec::new();
            let mut weighted = Vector3::zeros();

            group_of[seed] = g;
            queue.push_back(seed as u32);
            while let Some(t) = queue.pop_front() {
                triangles.push(t);
                weighted += mesh.triangle_normal(t as usize) * mesh.triangle_area(t as usize);
                for n in topo.neighbours(t).into_iter().flatten() {
                    let n_idx = n as usize;
                    if group_of[n_idx] == UNASSIGNED
                        && buckets[n_idx] == bucket
                        && mesh.triangle_group(n_idx) == mesh_group
                    {
                        group_of[n_idx] = g;
                        queue.push_back(n);
                    }
                }
            }

            let normal = weighted
                .try_normalize(1e-15)
                .unwrap_or_else(|| mesh.triangle_normal(seed));
            groups.push(PlanarGroup {
                triangles,
                normal,
                mesh_group,
            });
        }

        (groups, group_of)
    }
}

impl SbrepObject {
    /// Splits a set of boundary edges into simple chains.
    ///
    /// A chain ends wherever it reaches a black point (a vertex used by more
    /// than two edges of the object) or a vertex that does not have exactly
    /// two edges in the set. Cycles without such a vertex come out as closed
    /// chains.
    pub fn separate_loop_edge_by_merged(&self, edges: &[EdgeId]) -> Result<Vec<Vec<EdgeId>>> {
        let mut incident: FxHashMap<VertexId, SmallVec<[usize; 2]>> = FxHashMap::default();
        let mut ends = Vec::with_capacity(edges.len());
        for (i, &e) in edges.iter().enumerate() {
            let (a, b) = self.edge_vertices(e)?;
            incident.entry(a).or_default().push(i);
            incident.entry(b).or_default().push(i);
            ends.push((a, b));
        }

        let stops = |v: VertexId| -> bool {
            incident.get(&v).map_or(true, |l| l.len() != 2)
                || self.vertices.get(v).map_or(true, |d| d.parents.len() > 2)
        };

        let mut used = vec![false; edges.len()];
        let mut chains = Vec::new();

        let walk = |start: VertexId, first: usize, used: &mut [bool]| -> Vec<EdgeId> {
            let mut chain = Vec::new();
            let mut current = start;
            let mut next = Some(first);
            while let Some(i) = next {
                used[i] = true;
                chain.push(edges[i]);
                let (a, b) = ends[i];
                current = if a == current { b } else { a };
                if current == start || stops(current) {
                    break;
                }
                next = incident[&current].iter().copied().find(|&j| !used[j]);
            }
            chain
        };

        // Open chains, from every stop vertex.
        for i in 0..edges.len() {
            let (a, b) = ends[i];
            for v in [a, b] {
                if !stops(v) {
                    continue;
                }
                loop {
                    let Some(j) = incident[&v].iter().copied().find(|&j| !used[j]) else {
                        break;
                    };
                    chains.push(walk(v, j, &mut used));
                }
            }
        }

        // Closed chains without any stop vertex.
        for i in 0..edges.len() {
            if !used[i] {
                chains.push(walk(ends[i].0, i, &mut used));
            }
        }

        Ok(chains)
    }
}
