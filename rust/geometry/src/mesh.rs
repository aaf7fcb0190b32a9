// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh data structures

use nalgebra::{Point3, Vector3};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::{Error, Result};

/// Indexed triangle mesh with per-triangle group IDs and normals.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<Point3<f64>>,
    /// Triangle indices (i0, i1, i2), counter-clockwise around the normal
    pub indices: Vec<[u32; 3]>,
    /// Face-group ID per triangle
    pub groups: Vec<i32>,
    /// Unit normal per triangle
    pub normals: Vec<Vector3<f64>>,
}

impl Mesh {
    /// Create a new empty mesh
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh with capacity
    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            positions: Vec::with_capacity(vertex_count),
            indices: Vec::with_capacity(triangle_count),
            groups: Vec::with_capacity(triangle_count),
            normals: Vec::with_capacity(triangle_count),
        }
    }

    /// Builds a mesh from positions and triangles, all in group 0, with
    /// geometric normals.
    pub fn from_triangles(positions: Vec<Point3<f64>>, indices: Vec<[u32; 3]>) -> Self {
        let count = indices.len();
        let mut mesh = Self {
            positions,
            indices,
            groups: vec![0; count],
            normals: Vec::with_capacity(count),
        };
        mesh.recompute_normals();
        mesh
    }

    /// Add a vertex, returning its index
    #[inline]
    pub fn add_vertex(&mut self, position: Point3<f64>) -> u32 {
        self.positions.push(position);
        (self.positions.len() - 1) as u32
    }

    /// Add a triangle; its normal is computed from the winding
    #[inline]
    pub fn add_triangle(&mut self, i0: u32, i1: u32, i2: u32, group: i32) {
        self.indices.push([i0, i1, i2]);
        self.groups.push(group);
        let normal = self.geometric_normal(self.indices.len() - 1);
        self.normals.push(normal);
    }

    /// Add a triangle with an explicit normal
    #[inline]
    pub fn add_triangle_with_normal(
        &mut self,
        i0: u32,
        i1: u32,
        i2: u32,
        group: i32,
        normal: Vector3<f64>,
    ) {
        self.indices.push([i0, i1, i2]);
        self.groups.push(group);
        self.normals.push(normal);
    }

    /// Recomputes every triangle normal from its winding
    pub fn recompute_normals(&mut self) {
        self.normals = (0..self.indices.len())
            .map(|t| self.geometric_normal(t))
            .collect();
    }

    /// Vertex indices of a triangle
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        let [a, b, c] = self.indices[t];
        [a as usize, b as usize, c as usize]
    }

    /// Corner positions of a triangle
    #[inline]
    pub fn triangle_points(&self, t: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangle(t);
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Stored normal of a triangle
    #[inline]
    pub fn triangle_normal(&self, t: usize) -> Vector3<f64> {
        self.normals[t]
    }

    /// Group ID of a triangle
    #[inline]
    pub fn triangle_group(&self, t: usize) -> i32 {
        self.groups[t]
    }

    /// Normal from the cross product of the triangle edges
    pub fn geometric_normal(&self, t: usize) -> Vector3<f64> {
        let [a, b, c] = self.triangle_points(t);
        (b - a)
            .cross(&(c - a))
            .try_normalize(1e-15)
            .unwrap_or_else(Vector3::zeros)
    }

    /// Area of one triangle
    #[inline]
    pub fn triangle_area(&self, t: usize) -> f64 {
        let [a, b, c] = self.triangle_points(t);
        (b - a).cross(&(c - a)).norm() * 0.5
    }

    /// Total surface area
    pub fn surface_area(&self) -> f64 {
        (0..self.indices.len()).map(|t| self.triangle_area(t)).sum()
    }

    /// Reverses the winding of a triangle and its normal
    pub fn flip_triangle(&mut self, t: usize) {
        self.indices[t].swap(1, 2);
        self.normals[t] = -self.normals[t];
    }

    /// Merge another mesh into this one
    pub fn merge(&mut self, other: &Mesh) {
        if other.is_empty() {
            return;
        }

        let vertex_offset = self.positions.len() as u32;

        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(
            other
                .indices
                .iter()
                .map(|t| [t[0] + vertex_offset, t[1] + vertex_offset, t[2] + vertex_offset]),
        );
        self.groups.extend_from_slice(&other.groups);
        self.normals.extend_from_slice(&other.normals);
    }

    /// Get vertex count
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Get triangle count
    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Check if mesh is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Calculate bounds (min, max)
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        if self.positions.is_empty() {
            return (Point3::origin(), Point3::origin());
        }

        let mut min = Point3::new(f64::MAX, f64::MAX, f64::MAX);
        let mut max = Point3::new(f64::MIN, f64::MIN, f64::MIN);

        for p in &self.positions {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        (min, max)
    }

    /// Clear the mesh
    pub fn clear(&mut self) {
        self.positions.clear();
        self.indices.clear();
        self.groups.clear();
        self.normals.clear();
    }
}

/// An undirected mesh edge and the (at most two) triangles using it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshEdge {
    /// Endpoints, lower index first
    pub vertices: [u32; 2],
    /// Adjacent triangles; a missing side marks a mesh border
    pub triangles: [Option<u32>; 2],
}

impl MeshEdge {
    #[inline]
    pub fn is_border(&self) -> bool {
        self.triangles[0].is_none() || self.triangles[1].is_none()
    }

    /// The triangle on the other side of `t`, if any
    #[inline]
    pub fn other_triangle(&self, t: u32) -> Option<u32> {
        match self.triangles {
            [Some(a), b] if a == t => b,
            [a, Some(b)] if b == t => a,
            _ => None,
        }
    }
}

/// Edge adjacency for a [`Mesh`].
///
/// Plays the role of the half-edge library: triangle ↔ edge incidence and
/// neighbour queries. Edges shared by three or more triangles are rejected.
#[derive(Debug, Clone, Default)]
pub struct MeshTopology {
    edges: Vec<MeshEdge>,
    /// `triangle_edges[t][k]` is the edge from corner `k` to corner `k + 1`
    triangle_edges: Vec<[u32; 3]>,
    lookup: FxHashMap<(u32, u32), u32>,
}

impl MeshTopology {
    /// Builds the adjacency tables.
    pub fn build(mesh: &Mesh) -> Result<Self> {
        let vertex_count = mesh.positions.len() as u32;
        let mut topo = Self {
            edges: Vec::with_capacity(mesh.indices.len() * 3 / 2),
            triangle_edges: Vec::with_capacity(mesh.indices.len()),
            lookup: FxHashMap::default(),
        };

        for (t, tri) in mesh.indices.iter().enumerate() {
            if tri.iter().any(|&i| i >= vertex_count) {
                return Err(Error::InvalidMesh(format!(
                    "triangle {t} references a missing vertex"
                )));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                return Err(Error::InvalidMesh(format!("triangle {t} is degenerate")));
            }

            let mut edges = [0u32; 3];
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                let index = match topo.lookup.get(&key) {
                    Some(&i) => i,
                    None => {
                        let i = topo.edges.len() as u32;
                        topo.edges.push(MeshEdge {
                            vertices: [key.0, key.1],
                            triangles: [None, None],
                        });
                        topo.lookup.insert(key, i);
                        i
                    }
                };

                let slots = &mut topo.edges[index as usize].triangles;
                if slots[0].is_none() {
                    slots[0] = Some(t as u32);
                } else if slots[1].is_none() {
                    slots[1] = Some(t as u32);
                } else {
                    return Err(Error::NonManifoldEdge(key.0, key.1));
                }
                edges[k] = index;
            }
            topo.triangle_edges.push(edges);
        }

        Ok(topo)
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn edge(&self, e: u32) -> &MeshEdge {
        &self.edges[e as usize]
    }

    pub fn edges(&self) -> impl Iterator<Item = (u32, &MeshEdge)> {
        self.edges.iter().enumerate().map(|(i, e)| (i as u32, e))
    }

    #[inline]
    pub fn triangle_edges(&self, t: u32) -> [u32; 3] {
        self.triangle_edges[t as usize]
    }

    /// Edge between two vertices, if the mesh has one
    pub fn edge_between(&self, a: u32, b: u32) -> Option<u32> {
        let key = if a < b { (a, b) } else { (b, a) };
        self.lookup.get(&key).copied()
    }

    /// Neighbour triangles across each of the three edges
    pub fn neighbours(&self, t: u32) -> [Option<u32>; 3] {
        let edges = self.triangle_edges(t);
        [
            self.edge(edges[0]).other_triangle(t),
            self.edge(edges[1]).other_triangle(t),
            self.edge(edges[2]).other_triangle(t),
        ]
    }

    /// Boundary loops of a triangle subset, as mesh edge indices in walking
    /// order.
    ///
    /// Boundary half-edges keep the winding of their triangle, so the region
    /// lies to the left of the walk around `normal`. Where several loops
    /// touch at one vertex the walk takes the sharpest left turn, which keeps
    /// every loop simple.
    pub fn region_boundary_loops(
        &self,
        mesh: &Mesh,
        triangles: &[u32],
        normal: &Vector3<f64>,
    ) -> Result<Vec<Vec<u32>>> {
        let region: FxHashSet<u32> = triangles.iter().copied().collect();

        // (from, to, edge)
        let mut half_edges: Vec<(u32, u32, u32)> = Vec::new();
        for &t in triangles {
            let tri = mesh.indices[t as usize];
            let edges = self.triangle_edges(t);
            for k in 0..3 {
                let e = edges[k];
                let inside = self
                    .edge(e)
                    .other_triangle(t)
                    .is_some_and(|o| region.contains(&o));
                if !inside {
                    half_edges.push((tri[k], tri[(k + 1) % 3], e));
                }
            }
        }

        let mut outgoing: FxHashMap<u32, SmallVec<[usize; 2]>> = FxHashMap::default();
        for (i, h) in half_edges.iter().enumerate() {
            outgoing.entry(h.0).or_default().push(i);
        }

        let mut used = vec![false; half_edges.len()];
        let mut loops = Vec::new();

        for start in 0..half_edges.len() {
            if used[start] {
                continue;
            }
            used[start] = true;
            let mut current = start;
            let mut edges = vec![half_edges[start].2];

            loop {
                let (from, to, _) = half_edges[current];
                let candidates: SmallVec<[usize; 4]> = outgoing
                    .get(&to)
                    .map(|list| {
                        list.iter()
                            .copied()
                            .filter(|&h| !used[h] || h == start)
                            .collect()
                    })
                    .unwrap_or_default();

                let next = pick_left_turn(mesh, normal, from, to, &candidates, &half_edges)
                    .ok_or_else(|| {
                        Error::InvalidMesh(format!("boundary walk dead-ends at vertex {to}"))
                    })?;

                if next == start {
                    break;
                }
                used[next] = true;
                edges.push(half_edges[next].2);
                current = next;

                if edges.len() > half_edges.len() {
                    return Err(Error::InvalidMesh("boundary walk did not terminate".into()));
                }
            }

            loops.push(edges);
        }

        Ok(loops)
    }
}

/// Among outgoing half-edges at `to`, picks the one turning furthest to the
/// left of the incoming direction `from → to`.
fn pick_left_turn(
    mesh: &Mesh,
    normal: &Vector3<f64>,
    from: u32,
    to: u32,
    candidates: &[usize],
    half_edges: &[(u32, u32, u32)],
) -> Option<usize> {
    if candidates.len() <= 1 {
        return candidates.first().copied();
    }
    let pivot = mesh.positions[to as usize];
    let back = mesh.positions[from as usize] - pivot;

    candidates.iter().copied().max_by(|&a, &b| {
        let angle = |h: usize| {
            let d = mesh.positions[half_edges[h].1 as usize] - pivot;
            let theta = normal.dot(&back.cross(&d)).atan2(back.dot(&d));
            if theta < 0.0 {
                theta + std::f64::consts::TAU
            } else {
                theta
            }
        };
        angle(a).total_cmp(&angle(b))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Unit cube, 12 outward-facing triangles.
    pub(crate) fn cube() -> Mesh {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        let indices = vec![
            [0, 2, 1], [0, 3, 2], // bottom
            [4, 5, 6], [4, 6, 7], // top
            [0, 1, 5], [0, 5, 4], // front
            [2, 3, 7], [2, 7, 6], // back
            [0, 4, 7], [0, 7, 3], // left
            [1, 2, 6], [1, 6, 5], // right
        ];
        Mesh::from_triangles(positions, indices)
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = Mesh::new();
        assert!(mesh.is_empty());
        assert_eq!(mesh.vertex_count(), 0);
        assert_eq!(mesh.triangle_count(), 0);
    }

    #[test]
    fn test_cube_normals_and_area() {
        let mesh = cube();
        assert_relative_eq!(mesh.surface_area(), 6.0, epsilon = 1e-12);
        assert_relative_eq!(mesh.triangle_normal(0), Vector3::new(0.0, 0.0, -1.0));
        assert_relative_eq!(mesh.triangle_normal(2), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_merge() {
        let mut a = cube();
        let b = cube();
        a.merge(&b);
        assert_eq!(a.vertex_count(), 16);
        assert_eq!(a.triangle_count(), 24);
        assert_eq!(a.indices[12], [8, 10, 9]);
    }

    #[test]
    fn test_topology_of_closed_cube() {
        let mesh = cube();
        let topo = MeshTopology::build(&mesh).unwrap();
        assert_eq!(topo.edge_count(), 18);
        assert!(topo.edges().all(|(_, e)| !e.is_border()));
        assert!(topo.neighbours(0).iter().all(Option::is_some));
    }

    #[test]
    fn test_non_manifold_edge_rejected() {
        let positions = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, -1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let mesh = Mesh::from_triangles(positions, vec![[0, 1, 2], [1, 0, 3], [0, 1, 4]]);
        assert!(matches!(
            MeshTopology::build(&mesh),
            Err(Error::NonManifoldEdge(0, 1))
        ));
    }

    #[test]
    fn test_region_boundary_loop_of_cube_side() {
        let mesh = cube();
        let topo = MeshTopology::build(&mesh).unwrap();
        let loops = topo
            .region_boundary_loops(&mesh, &[2, 3], &Vector3::new(0.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].len(), 4);
    }

    #[test]
    fn test_region_boundary_loops_with_hole() {
        // 3x3 grid of quads in the XY plane, centre quad removed.
        let mut mesh = Mesh::new();
        for y in 0..4 {
            for x in 0..4 {
                mesh.add_vertex(Point3::new(x as f64, y as f64, 0.0));
            }
        }
        let mut region = Vec::new();
        for y in 0..3u32 {
            for x in 0..3u32 {
                if x == 1 && y == 1 {
                    continue;
                }
                let v = y * 4 + x;
                region.push(mesh.triangle_count() as u32);
                mesh.add_triangle(v, v + 1, v + 5, 0);
                region.push(mesh.triangle_count() as u32);
                mesh.add_triangle(v, v + 5, v + 4, 0);
            }
        }
        let topo = MeshTopology::build(&mesh).unwrap();
        let mut loops = topo
            .region_boundary_loops(&mesh, &region, &Vector3::z())
            .unwrap();
        loops.sort_by_key(|l| l.len());
        assert_eq!(loops.len(), 2);
        assert_eq!(loops[0].len(), 4);
        assert_eq!(loops[1].len(), 12);
    }
}
