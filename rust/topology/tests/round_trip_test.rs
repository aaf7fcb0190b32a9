// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mesh → B-Rep → mesh conversions.

mod common;

use approx::assert_relative_eq;
use sbrep_geometry::Vector3;
use sbrep_topology::{
    MergeStrategy, MeshBuildOptions, SbrepBuilder, SbrepObject, SbrepToMeshBuilder,
};

use common::{assert_well_formed, subdivided_box};

fn normals(obj: &SbrepObject) -> Vec<[i64; 3]> {
    let mut normals: Vec<[i64; 3]> = obj
        .faces()
        .values()
        .map(|f| {
            let n = f.plane.normal;
            [n.x.round() as i64, n.y.round() as i64, n.z.round() as i64]
        })
        .collect();
    normals.sort();
    normals
}

#[test]
fn subdivided_box_collapses_to_six_faces() {
    let mesh = subdivided_box(Vector3::new(3.0, 2.0, 1.0), 3);
    assert_eq!(mesh.triangle_count(), 6 * 9 * 2);

    let obj = SbrepBuilder::default().convert(&mesh).unwrap();
    assert_eq!(obj.face_count(), 6);
    assert_eq!(obj.loop_count(), 6);
    assert_eq!(obj.verge_count(), 12);
    // Box edges keep the mesh edges along them.
    assert_eq!(obj.edge_count(), 12 * 3);
    assert_eq!(obj.vertex_count(), 8 + 12 * 2);
    assert_relative_eq!(obj.total_area().unwrap(), mesh.surface_area(), epsilon = 1e-9);
    assert_eq!(
        normals(&obj),
        vec![[-1, 0, 0], [0, -1, 0], [0, 0, -1], [0, 0, 1], [0, 1, 0], [1, 0, 0]]
    );
    assert_well_formed(&obj);
}

#[test]
fn round_trip_preserves_area_and_normals() {
    let mesh = subdivided_box(Vector3::new(3.0, 2.0, 1.0), 1);
    let obj = SbrepBuilder::default().convert(&mesh).unwrap();
    let rebuilt = SbrepToMeshBuilder::new(MeshBuildOptions::default())
        .convert(&obj)
        .unwrap();

    assert_relative_eq!(rebuilt.surface_area(), mesh.surface_area(), epsilon = 1e-9);
    assert_eq!(rebuilt.vertex_count(), 8);
    assert_eq!(rebuilt.triangle_count(), 12);
    for t in 0..rebuilt.triangle_count() {
        let geometric = rebuilt.geometric_normal(t);
        assert!(geometric.dot(&rebuilt.triangle_normal(t)) > 0.99);
    }

    // Building again from the rebuilt mesh is stable.
    let again = SbrepBuilder::default().convert(&rebuilt).unwrap();
    assert_eq!(again.face_count(), 6);
    assert_eq!(normals(&again), normals(&obj));
}

#[test]
fn round_trip_with_collinear_boundary_vertices() {
    let mesh = subdivided_box(Vector3::new(3.0, 2.0, 1.0), 3);
    let obj = SbrepBuilder::default().convert(&mesh).unwrap();
    let rebuilt = SbrepToMeshBuilder::new(MeshBuildOptions::default())
        .convert(&obj)
        .unwrap();
    assert_relative_eq!(rebuilt.surface_area(), 22.0, epsilon = 1e-9);
}

#[test]
fn parallel_and_global_strategies_agree() {
    let mesh = subdivided_box(Vector3::new(1.0, 1.0, 1.0), 4);
    let obj = SbrepBuilder::default().convert(&mesh).unwrap();

    let neighbourhood = SbrepToMeshBuilder::new(MeshBuildOptions::default());
    let sequential = neighbourhood.convert(&obj).unwrap();
    let parallel = neighbourhood.convert_parallel(&obj).unwrap();
    assert_eq!(sequential.positions, parallel.positions);
    assert_eq!(sequential.indices, parallel.indices);

    let global = SbrepToMeshBuilder::new(MeshBuildOptions {
        strategy: MergeStrategy::Global,
        ..Default::default()
    })
    .convert(&obj)
    .unwrap();
    assert_eq!(global.vertex_count(), sequential.vertex_count());
    assert_relative_eq!(global.surface_area(), 6.0, epsilon = 1e-9);
}

#[test]
fn thin_plate_keeps_its_vertices_under_global_merging() {
    let mesh = subdivided_box(Vector3::new(100.0, 0.5, 0.5), 1);
    let obj = SbrepBuilder::default().convert(&mesh).unwrap();
    let global = SbrepToMeshBuilder::new(MeshBuildOptions {
        strategy: MergeStrategy::Global,
        ..Default::default()
    });

    let rebuilt = global.convert(&obj).unwrap();
    assert_eq!(rebuilt.vertex_count(), 8);
    assert_eq!(rebuilt.triangle_count(), 12);
    assert_relative_eq!(rebuilt.surface_area(), 200.5, epsilon = 1e-9);

    let parallel = global.convert_parallel(&obj).unwrap();
    assert_eq!(parallel.vertex_count(), 8);
    assert_relative_eq!(parallel.surface_area(), 200.5, epsilon = 1e-9);
}

#[test]
fn subdivided_thin_plate_merges_like_neighbourhood() {
    // Boundary vertices along the short box edges are 0.125 apart.
    let mesh = subdivided_box(Vector3::new(100.0, 0.5, 0.5), 4);
    let obj = SbrepBuilder::default().convert(&mesh).unwrap();

    let neighbourhood = SbrepToMeshBuilder::new(MeshBuildOptions::default())
        .convert(&obj)
        .unwrap();
    let global = SbrepToMeshBuilder::new(MeshBuildOptions {
        strategy: MergeStrategy::Global,
        ..Default::default()
    })
    .convert(&obj)
    .unwrap();
    assert_eq!(global.vertex_count(), neighbourhood.vertex_count());
    assert_relative_eq!(global.surface_area(), 200.5, epsilon = 1e-9);
    assert_relative_eq!(neighbourhood.surface_area(), 200.5, epsilon = 1e-9);
}

#[test]
fn text_round_trip_of_built_object() {
    let obj = SbrepBuilder::default()
        .convert(&subdivided_box(Vector3::new(2.0, 2.0, 2.0), 2))
        .unwrap();
    let text = obj.to_text().unwrap();
    let restored = SbrepObject::from_text(&text).unwrap();
    assert_eq!(restored.to_text().unwrap(), text);
    assert_relative_eq!(restored.total_area().unwrap(), 24.0, epsilon = 1e-9);
    assert_well_formed(&restored);
}
