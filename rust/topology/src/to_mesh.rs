// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! B-Rep → mesh reconstruction.
//!
//! Every face is triangulated on its own: its loops are projected into the
//! face's plane frame, handed to a [`Triangulator`] as constraint rings, and
//! any Steiner points are lifted back onto the plane. The per-face patches
//! are then merged into one vertex table.
//!
//! [`convert_parallel`](SbrepToMeshBuilder::convert_parallel) triangulates
//! faces on the rayon pool. Patches are merged under one mutex; after the
//! join a single-threaded pass orders triangles by face and renumbers
//! vertices by first use. With [`MergeStrategy::Neighbourhood`] and no
//! Steiner points both entry points produce the same mesh. Otherwise the
//! merged vertex set is the same, but when two positions fall within the
//! merge distance the one kept depends on the order faces finish in.

use std::sync::{Mutex, PoisonError};

use nalgebra::{Point2, Point3, Vector3};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use sbrep_geometry::{EarcutTriangulator, Mesh, Triangulator};
use smallvec::SmallVec;
use tracing::{debug, info};

use crate::arena::SbrepObject;
use crate::config::{MergeStrategy, MeshBuildOptions};
use crate::error::Result;
use crate::keys::*;

/// A vertex of a face patch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatchVertex {
    pub position: Point3<f64>,
    /// B-Rep vertex it came from; `None` for Steiner points.
    pub source: Option<VertexId>,
}

/// Triangulation of one face, before merging.
#[derive(Debug, Clone)]
pub struct FacePatch {
    pub face: FaceId,
    pub group: i32,
    pub normal: Vector3<f64>,
    pub vertices: Vec<PatchVertex>,
    /// Indices into `vertices`.
    pub triangles: Vec<[usize; 3]>,
}

/// Converts an [`SbrepObject`] back into a triangle mesh.
#[derive(Debug, Clone, Default)]
pub struct SbrepToMeshBuilder<T: Triangulator = EarcutTriangulator> {
    triangulator: T,
    options: MeshBuildOptions,
}

impl SbrepToMeshBuilder<EarcutTriangulator> {
    pub fn new(options: MeshBuildOptions) -> Self {
        Self {
            triangulator: EarcutTriangulator,
            options,
        }
    }
}

impl<T: Triangulator> SbrepToMeshBuilder<T> {
    pub fn with_triangulator(triangulator: T, options: MeshBuildOptions) -> Self {
        Self {
            triangulator,
            options,
        }
    }

    pub fn options(&self) -> &MeshBuildOptions {
        &self.options
    }

    /// Triangulates every face in ID order.
    pub fn convert(&self, obj: &SbrepObject) -> Result<Mesh> {
        let mut table = VertexTable::new(self.options.strategy, self.merge_distance(obj));
        let mut triangles = Vec::new();
        for face in obj.faces().ids() {
            let patch = self.triangulate_face(obj, face)?;
            let neighbours = self.neighbours(obj, face)?;
            table.merge_patch(&patch, &neighbours, &mut triangles);
        }
        Ok(self.finish(table, triangles))
    }

    /// Triangulates faces in parallel. The vertex table and triangle list
    /// sit behind one mutex; lookup and insert of a patch happen in a
    /// single critical section.
    pub fn convert_parallel(&self, obj: &SbrepObject) -> Result<Mesh> {
        let faces: Vec<FaceId> = obj.faces().ids().collect();
        let shared = Mutex::new((
            VertexTable::new(self.options.strategy, self.merge_distance(obj)),
            Vec::new(),
        ));

        faces.par_iter().try_for_each(|&face| -> Result<()> {
            let patch = self.triangulate_face(obj, face)?;
            let neighbours = self.neighbours(obj, face)?;
            let mut guard = shared.lock().unwrap_or_else(PoisonError::into_inner);
            let (table, triangles) = &mut *guard;
            table.merge_patch(&patch, &neighbours, triangles);
            Ok(())
        })?;

        let (table, triangles) = shared.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(self.finish(table, triangles))
    }

    /// Triangulates one face in its plane frame.
    pub fn triangulate_face(&self, obj: &SbrepObject, face: FaceId) -> Result<FacePatch> {
        let data = obj.faces().try_get(face)?;
        let frame = obj.face_transform(face)?;
        let normal = data.plane.normal;

        let mut vertices: Vec<PatchVertex> = Vec::new();
        let mut points: Vec<Point2<f64>> = Vec::new();
        let mut local: FxHashMap<VertexId, usize> = FxHashMap::default();
        let mut constraints: Vec<(usize, usize)> = Vec::new();

        for l in data.loops() {
            let ring = obj.closed_contour_vertices(l)?;
            let mut indices = Vec::with_capacity(ring.len());
            for v in ring {
                let i = match local.get(&v) {
                    Some(&i) => i,
                    None => {
                        let position = obj.vertex_point(v)?;
                        vertices.push(PatchVertex {
                            position,
                            source: Some(v),
                        });
                        points.push(frame.to_local(&position));
                        local.insert(v, vertices.len() - 1);
                        vertices.len() - 1
                    }
                };
                indices.push(i);
            }
            for k in 0..indices.len() {
                constraints.push((indices[k], indices[(k + 1) % indices.len()]));
            }
        }

        let triangulation = self.triangulator.triangulate(&points, &constraints)?;
        for p in triangulation.vertices.iter().skip(points.len()) {
            vertices.push(PatchVertex {
                position: frame.to_world(p),
                source: None,
            });
        }

        let mut triangles = triangulation.triangles;
        if self.options.fix_normals {
            for t in &mut triangles {
                fix_normal(t, &vertices, &normal);
            }
        }

        Ok(FacePatch {
            face,
            group: data.group_id,
            normal,
            vertices,
            triangles,
        })
    }

    fn merge_distance(&self, obj: &SbrepObject) -> f64 {
        self.options.tolerances.merge_distance(obj.diagonal())
    }

    fn neighbours(&self, obj: &SbrepObject, face: FaceId) -> Result<Vec<FaceId>> {
        match self.options.strategy {
            MergeStrategy::Global => Ok(Vec::new()),
            MergeStrategy::Neighbourhood => obj.neighbour_faces(face),
        }
    }

    /// Orders triangles by face and renumbers vertices by first use.
    fn finish(&self, table: VertexTable, mut triangles: Vec<MergedTriangle>) -> Mesh {
        triangles.sort_by_key(|t| t.face);

        let mut remap: Vec<Option<u32>> = vec![None; table.positions.len()];
        let mut mesh = Mesh::with_capacity(table.positions.len(), triangles.len());
        for t in &triangles {
            let mut corners = [0u32; 3];
            for (k, &old) in t.corners.iter().enumerate() {
                corners[k] = match remap[old as usize] {
                    Some(i) => i,
                    None => {
                        let i = mesh.add_vertex(table.positions[old as usize]);
                        remap[old as usize] = Some(i);
                        i
                    }
                };
            }
            mesh.add_triangle_with_normal(corners[0], corners[1], corners[2], t.group, t.normal);
        }

        debug!(
            merged_vertices = table.positions.len(),
            "vertex table"
        );
        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "reconstructed mesh from B-Rep"
        );
        mesh
    }
}

/// Reverses a triangle whose winding disagrees with `normal`.
pub fn fix_normal(triangle: &mut [usize; 3], vertices: &[PatchVertex], normal: &Vector3<f64>) {
    let a = vertices[triangle[0]].position;
    let b = vertices[triangle[1]].position;
    let c = vertices[triangle[2]].position;
    if (b - a).cross(&(c - a)).dot(normal) < 0.0 {
        triangle.swap(1, 2);
    }
}

#[derive(Debug, Clone, Copy)]
struct MergedTriangle {
    face: FaceId,
    corners: [u32; 3],
    group: i32,
    normal: Vector3<f64>,
}

/// Deduplicating vertex table shared by all faces.
#[derive(Debug)]
struct VertexTable {
    strategy: MergeStrategy,
    tolerance: f64,
    positions: Vec<Point3<f64>>,
    by_source: FxHashMap<VertexId, u32>,
    by_face: FxHashMap<FaceId, Vec<u32>>,
    grid: FxHashMap<[i64; 3], SmallVec<[u32; 4]>>,
}

impl VertexTable {
    fn new(strategy: MergeStrategy, tolerance: f64) -> Self {
        Self {
            strategy,
            tolerance,
            positions: Vec::new(),
            by_source: FxHashMap::default(),
            by_face: FxHashMap::default(),
            grid: FxHashMap::default(),
        }
    }

    fn merge_patch(
        &mut self,
        patch: &FacePatch,
        neighbours: &[FaceId],
        triangles: &mut Vec<MergedTriangle>,
    ) {
        let ids: Vec<u32> = patch
            .vertices
            .iter()
            .map(|v| self.insert(v, neighbours))
            .collect();
        self.by_face.insert(patch.face, ids.clone());
        triangles.extend(patch.triangles.iter().map(|t| MergedTriangle {
            face: patch.face,
            corners: [ids[t[0]], ids[t[1]], ids[t[2]]],
            group: patch.group,
            normal: patch.normal,
        }));
    }

    fn insert(&mut self, vertex: &PatchVertex, neighbours: &[FaceId]) -> u32 {
        let found = match self.strategy {
            MergeStrategy::Global => self
                .positions
                .iter()
                .position(|p| (p - vertex.position).norm() <= self.tolerance)
                .map(|i| i as u32),
            MergeStrategy::Neighbourhood => match vertex.source {
                Some(source) => self.by_source.get(&source).copied(),
                None => self
                    .find_in_neighbours(&vertex.position, neighbours)
                    .or_else(|| self.find_in_grid(&vertex.position)),
            },
        };
        if let Some(i) = found {
            return i;
        }

        let i = self.positions.len() as u32;
        self.positions.push(vertex.position);
        if let Some(source) = vertex.source {
            self.by_source.insert(source, i);
        }
        let cell = self.cell(&vertex.position);
        self.grid.entry(cell).or_default().push(i);
        i
    }

    fn find_in_neighbours(&self, p: &Point3<f64>, neighbours: &[FaceId]) -> Option<u32> {
        neighbours
            .iter()
            .filter_map(|f| self.by_face.get(f))
            .flatten()
            .copied()
            .find(|&i| (self.positions[i as usize] - p).norm() <= self.tolerance)
    }

    fn find_in_grid(&self, p: &Point3<f64>) -> Option<u32> {
        let [cx, cy, cz] = self.cell(p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.grid.get(&[cx + dx, cy + dy, cz + dz]) else {
                        continue;
                    };
                    if let Some(&i) = bucket
                        .iter()
                        .find(|&&i| (self.positions[i as usize] - p).norm() <= self.tolerance)
                    {
                        return Some(i);
                    }
                }
            }
        }
        None
    }

    fn cell(&self, p: &Point3<f64>) -> [i64; 3] {
        let size = self.tolerance.max(1e-12);
        [
            (p.x / size).floor() as i64,
            (p.y / size).floor() as i64,
            (p.z / size).floor() as i64,
        ]
    }
}
