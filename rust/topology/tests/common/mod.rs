// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![allow(dead_code)]

use std::collections::HashMap;

use sbrep_geometry::{Mesh, Point2, Point3, Vector3};
use sbrep_topology::SbrepObject;

/// Axis-aligned box `[0, size]` with every side split into `n × n` quads.
/// Triangles are wound counter-clockwise seen from outside.
pub fn subdivided_box(size: Vector3<f64>, n: usize) -> Mesh {
    let (x, y, z) = (Vector3::x(), Vector3::y(), Vector3::z());
    let sides = [
        (Point3::origin(), y * size.y, x * size.x),
        (Point3::new(0.0, 0.0, size.z), x * size.x, y * size.y),
        (Point3::origin(), x * size.x, z * size.z),
        (Point3::new(0.0, size.y, 0.0), z * size.z, x * size.x),
        (Point3::origin(), z * size.z, y * size.y),
        (Point3::new(size.x, 0.0, 0.0), y * size.y, z * size.z),
    ];

    let mut mesh = Mesh::new();
    let mut index: HashMap<[i64; 3], u32> = HashMap::new();
    let mut vertex = |mesh: &mut Mesh, p: Point3<f64>| {
        let key = [
            (p.x * 1e6).round() as i64,
            (p.y * 1e6).round() as i64,
            (p.z * 1e6).round() as i64,
        ];
        *index.entry(key).or_insert_with(|| mesh.add_vertex(p))
    };

    for (origin, u, v) in sides {
        let at = |i: usize, j: usize| origin + u * (i as f64 / n as f64) + v * (j as f64 / n as f64);
        for i in 0..n {
            for j in 0..n {
                let a = vertex(&mut mesh, at(i, j));
                let b = vertex(&mut mesh, at(i + 1, j));
                let c = vertex(&mut mesh, at(i + 1, j + 1));
                let d = vertex(&mut mesh, at(i, j + 1));
                mesh.add_triangle(a, b, c, 0);
                mesh.add_triangle(a, c, d, 0);
            }
        }
    }
    mesh
}

pub fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point2<f64>> {
    vec![
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

/// Every loop walks back to its start after one vertex per edge, and the
/// parent sets are a fixpoint of `redefine_feedbacks`.
pub fn assert_well_formed(obj: &SbrepObject) {
    for l in obj.loops().ids() {
        let vertices = obj.closed_contour_vertices(l).unwrap();
        let edges = obj.loop_edges(l).unwrap();
        assert_eq!(vertices.len(), edges.len(), "loop {l}");
        let (a, b) = obj.edge_vertices(edges[0]).unwrap();
        assert!(vertices.contains(&a) && vertices.contains(&b));
    }
    assert!(obj.feedbacks_consistent());
}
