// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Polygon triangulation utilities
//!
//! Wrapper around earcutr for 2D polygon triangulation, plus the
//! [`Triangulator`] contract used by B-Rep to mesh reconstruction.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::geometry2d::area_signed;
use crate::{Error, Point2, Result};

/// Check if a polygon is convex (all cross products have same sign)
#[inline]
fn is_convex(points: &[Point2<f64>]) -> bool {
    if points.len() < 3 {
        return false;
    }

    let n = points.len();
    let mut sign = 0i8;

    for i in 0..n {
        let p0 = &points[i];
        let p1 = &points[(i + 1) % n];
        let p2 = &points[(i + 2) % n];

        // Cross product of edges
        let cross = (p1.x - p0.x) * (p2.y - p1.y) - (p1.y - p0.y) * (p2.x - p1.x);

        if cross.abs() > 1e-10 {
            let current_sign = if cross > 0.0 { 1i8 } else { -1i8 };
            if sign == 0 {
                sign = current_sign;
            } else if sign != current_sign {
                return false; // Sign changed - not convex
            }
        }
    }

    true
}

/// Simple fan triangulation for convex polygons
#[inline]
fn fan_triangulate(n: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity((n - 2) * 3);
    for i in 1..n - 1 {
        indices.push(0);
        indices.push(i);
        indices.push(i + 1);
    }
    indices
}

/// Triangulate a simple polygon (no holes)
/// Returns triangle indices into the input points
#[inline]
pub fn triangulate_polygon(points: &[Point2<f64>]) -> Result<Vec<usize>> {
    let n = points.len();

    if n < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points to triangulate".to_string(),
        ));
    }

    // FAST PATH: Triangle - no triangulation needed
    if n == 3 {
        return Ok(vec![0, 1, 2]);
    }

    // FAST PATH: Convex quad - simple fan
    if n == 4 && is_convex(points) {
        return Ok(vec![0, 1, 2, 0, 2, 3]);
    }

    // FAST PATH: Convex polygon - use fan triangulation
    if n <= 8 && is_convex(points) {
        return Ok(fan_triangulate(n));
    }

    // Flatten points for earcutr
    let mut vertices = Vec::with_capacity(n * 2);
    for p in points {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    // Triangulate using earcutr
    let indices = earcutr::earcut(&vertices, &[], 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices)
}

/// Triangulate a polygon with holes
/// Returns triangle indices into the combined vertex array (outer + all holes)
#[inline]
pub fn triangulate_polygon_with_holes(
    outer: &[Point2<f64>],
    holes: &[Vec<Point2<f64>>],
) -> Result<Vec<usize>> {
    if outer.len() < 3 {
        return Err(Error::TriangulationError(
            "Need at least 3 points in outer boundary".to_string(),
        ));
    }

    // FAST PATH: No holes - use optimized simple triangulation
    // Filter out empty or invalid holes
    let valid_holes: Vec<&Vec<Point2<f64>>> = holes.iter().filter(|h| h.len() >= 3).collect();

    if valid_holes.is_empty() {
        return triangulate_polygon(outer);
    }

    // Flatten vertices for earcutr
    let total_points: usize = outer.len() + valid_holes.iter().map(|h| h.len()).sum::<usize>();
    let mut vertices = Vec::with_capacity(total_points * 2);

    // Add outer boundary
    for p in outer {
        vertices.push(p.x);
        vertices.push(p.y);
    }

    // Add holes and track their start indices
    let mut hole_indices = Vec::with_capacity(valid_holes.len());
    for hole in valid_holes {
        hole_indices.push(vertices.len() / 2);
        for p in hole {
            vertices.push(p.x);
            vertices.push(p.y);
        }
    }

    // Triangulate using earcutr
    let indices = earcutr::earcut(&vertices, &hole_indices, 2)
        .map_err(|e| Error::TriangulationError(format!("{:?}", e)))?;

    Ok(indices)
}

/// Output of a [`Triangulator`].
#[derive(Debug, Clone, Default)]
pub struct Triangulation {
    /// Output vertices; the input vertices come first, in input order,
    /// followed by any Steiner points the triangulator added.
    pub vertices: Vec<Point2<f64>>,
    /// Triangles as indices into `vertices`, counter-clockwise.
    pub triangles: Vec<[usize; 3]>,
}

/// Constrained triangulation of a planar straight-line graph.
///
/// Every input edge must appear as a triangle edge in the output. Failure is
/// reported as an error and the caller must not use a partial result.
pub trait Triangulator: Send + Sync {
    fn triangulate(
        &self,
        vertices: &[Point2<f64>],
        edges: &[(usize, usize)],
    ) -> Result<Triangulation>;
}

/// [`Triangulator`] backed by earcutr.
///
/// The constraint edges must form closed rings (a polygon with holes, the
/// shape every planar face produces). The ring with the largest absolute
/// area is the outer boundary; every other ring is a hole. No Steiner points
/// are added.
#[derive(Debug, Clone, Copy, Default)]
pub struct EarcutTriangulator;

impl Triangulator for EarcutTriangulator {
    fn triangulate(
        &self,
        vertices: &[Point2<f64>],
        edges: &[(usize, usize)],
    ) -> Result<Triangulation> {
        let rings = rings_from_edges(vertices.len(), edges)?;
        if rings.is_empty() {
            return Err(Error::TriangulationError("no constraint rings".into()));
        }

        let areas: Vec<f64> = rings
            .iter()
            .map(|ring| {
                let pts: Vec<Point2<f64>> = ring.iter().map(|&i| vertices[i]).collect();
                area_signed(&pts)
            })
            .collect();

        let outer_idx = areas
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
            .unwrap_or(0);

        // Flattened index order: outer ring first, then holes.
        let mut order: Vec<usize> = rings[outer_idx].clone();
        let outer: Vec<Point2<f64>> = order.iter().map(|&i| vertices[i]).collect();
        let mut holes: Vec<Vec<Point2<f64>>> = Vec::with_capacity(rings.len() - 1);
        for (i, ring) in rings.iter().enumerate() {
            if i == outer_idx {
                continue;
            }
            holes.push(ring.iter().map(|&v| vertices[v]).collect());
            order.extend_from_slice(ring);
        }

        let flat = triangulate_polygon_with_holes(&outer, &holes)?;
        if flat.len() % 3 != 0 {
            return Err(Error::TriangulationError(format!(
                "index buffer length {} is not a multiple of 3",
                flat.len()
            )));
        }

        let mut triangles = Vec::with_capacity(flat.len() / 3);
        for tri in flat.chunks_exact(3) {
            let mut t = [order[tri[0]], order[tri[1]], order[tri[2]]];
            let a = vertices[t[0]];
            let b = vertices[t[1]];
            let c = vertices[t[2]];
            let cross = (b - a).perp(&(c - a));
            if cross < 0.0 {
                t.swap(1, 2);
            }
            triangles.push(t);
        }

        tracing::trace!(
            rings = rings.len(),
            triangles = triangles.len(),
            "earcut triangulation"
        );

        Ok(Triangulation {
            vertices: vertices.to_vec(),
            triangles,
        })
    }
}

/// Reassembles closed rings of vertex indices from undirected constraint
/// edges. Every referenced vertex must have an even, non-zero degree.
pub fn rings_from_edges(vertex_count: usize, edges: &[(usize, usize)]) -> Result<Vec<Vec<usize>>> {
    let mut incident: FxHashMap<usize, SmallVec<[usize; 4]>> = FxHashMap::default();
    for (i, &(a, b)) in edges.iter().enumerate() {
        if a >= vertex_count || b >= vertex_count {
            return Err(Error::TriangulationError(format!(
                "constraint edge {i} references a missing vertex"
            )));
        }
        if a == b {
            return Err(Error::TriangulationError(format!(
                "constraint edge {i} is degenerate"
            )));
        }
        incident.entry(a).or_default().push(i);
        incident.entry(b).or_default().push(i);
    }

    if let Some((v, list)) = incident.iter().find(|(_, list)| list.len() % 2 != 0) {
        return Err(Error::TriangulationError(format!(
            "vertex {v} has odd constraint degree {}",
            list.len()
        )));
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start_edge in 0..edges.len() {
        if used[start_edge] {
            continue;
        }
        used[start_edge] = true;
        let (start, mut current) = edges[start_edge];
        let mut ring = vec![start];

        while current != start {
            ring.push(current);
            let next_edge = incident[&current]
                .iter()
                .copied()
                .find(|&e| !used[e])
                .ok_or_else(|| {
                    Error::TriangulationError(format!("ring through vertex {current} is open"))
                })?;
            used[next_edge] = true;
            let (a, b) = edges[next_edge];
            current = if a == current { b } else { a };
            if ring.len() > edges.len() {
                return Err(Error::TriangulationError("ring walk did not terminate".into()));
            }
        }

        if ring.len() >= 3 {
            rings.push(ring);
        }
    }

    Ok(rings)
}
