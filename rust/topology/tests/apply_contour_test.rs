// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cutting faces of built objects with contours.

mod common;

use approx::assert_relative_eq;
use sbrep_geometry::{Point3, Vector3};
use sbrep_topology::{
    FaceId, MeshBuildOptions, SbrepBuilder, SbrepObject, SbrepToMeshBuilder, Tolerances,
};

use common::{assert_well_formed, subdivided_box};

fn box_object() -> SbrepObject {
    SbrepBuilder::default()
        .convert(&subdivided_box(Vector3::new(10.0, 10.0, 4.0), 1))
        .unwrap()
}

fn top_face(obj: &SbrepObject) -> FaceId {
    obj.faces()
        .iter()
        .find(|(_, f)| f.plane.normal.z > 0.5)
        .map(|(id, _)| id)
        .unwrap()
}

fn top_rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point3<f64>> {
    vec![
        Point3::new(x0, y0, 4.0),
        Point3::new(x1, y0, 4.0),
        Point3::new(x1, y1, 4.0),
        Point3::new(x0, y1, 4.0),
    ]
}

#[test]
fn contained_clip_on_box_top() {
    let mut obj = box_object();
    let top = top_face(&obj);
    let before = obj.total_area().unwrap();

    let result = obj
        .apply_intersect_contour_to_face(top, &top_rect(2.0, 2.0, 8.0, 8.0), None, &Tolerances::default())
        .unwrap();
    assert_eq!(result.inside.len(), 1);
    assert_eq!(result.outside.len(), 1);
    assert_eq!(obj.face_count(), 7);
    assert_relative_eq!(obj.face_area(result.inside[0]).unwrap(), 36.0, epsilon = 1e-9);
    assert_relative_eq!(obj.face_area(result.outside[0]).unwrap(), 64.0, epsilon = 1e-9);
    assert_relative_eq!(obj.total_area().unwrap(), before, epsilon = 1e-9);
    assert_well_formed(&obj);

    // The hole is triangulated around, and the clip region fills it.
    let mesh = SbrepToMeshBuilder::new(MeshBuildOptions::default())
        .convert(&obj)
        .unwrap();
    assert_relative_eq!(mesh.surface_area(), before, epsilon = 1e-9);
    assert_eq!(mesh.vertex_count(), 12);
}

#[test]
fn straddling_clip_conserves_area() {
    let mut obj = box_object();
    let top = top_face(&obj);
    let before = obj.total_area().unwrap();
    let faces_before = obj.face_count();

    let result = obj
        .apply_intersect_contour_to_face(top, &top_rect(7.0, 3.0, 13.0, 6.0), Some(9), &Tolerances::default())
        .unwrap();
    assert!(result.inside.len() + result.outside.len() >= 2);
    assert_eq!(obj.face_count(), faces_before - 1 + result.inside.len() + result.outside.len());

    let inside: f64 = result.inside.iter().map(|&f| obj.face_area(f).unwrap()).sum();
    let outside: f64 = result.outside.iter().map(|&f| obj.face_area(f).unwrap()).sum();
    assert_relative_eq!(inside, 9.0, epsilon = 1e-9);
    assert_relative_eq!(inside + outside, 100.0, epsilon = 1e-9);
    assert_relative_eq!(obj.total_area().unwrap(), before, epsilon = 1e-9);
    for &f in &result.inside {
        assert_eq!(obj.faces().try_get(f).unwrap().group_id, 9);
    }

    // The shared box edge at x = 10 now carries the two crossing points.
    assert!(obj.find_vertex(&Point3::new(10.0, 3.0, 4.0)).is_some());
    assert!(obj.find_vertex(&Point3::new(10.0, 6.0, 4.0)).is_some());
    assert_well_formed(&obj);

    let mesh = SbrepToMeshBuilder::new(MeshBuildOptions::default())
        .convert(&obj)
        .unwrap();
    assert_relative_eq!(mesh.surface_area(), before, epsilon = 1e-9);
}

#[test]
fn repeated_cuts_keep_object_consistent() {
    let mut obj = box_object();
    let top = top_face(&obj);
    let first = obj
        .apply_intersect_contour_to_face(top, &top_rect(-1.0, -1.0, 5.0, 11.0), Some(1), &Tolerances::default())
        .unwrap();
    assert_eq!(first.inside.len(), 1);
    assert_eq!(first.outside.len(), 1);

    let second = obj
        .apply_intersect_contour_to_face(
            first.outside[0],
            &top_rect(6.0, 6.0, 8.0, 8.0),
            Some(2),
            &Tolerances::default(),
        )
        .unwrap();
    assert_eq!(second.inside.len(), 1);
    assert_relative_eq!(obj.face_area(second.inside[0]).unwrap(), 4.0, epsilon = 1e-9);
    assert_relative_eq!(obj.total_area().unwrap(), 360.0, epsilon = 1e-9);
    assert_well_formed(&obj);

    let text = obj.to_text().unwrap();
    let restored = SbrepObject::from_text(&text).unwrap();
    assert_eq!(restored.to_text().unwrap(), text);
    assert_eq!(restored.face_count(), obj.face_count());
}

/// Cuts `clip` into the top face, which it touches at `touch` only, and
/// checks that the remainder keeps the clip as a hole sharing that vertex.
fn cut_touching_clip(clip: &[Point3<f64>], touch: Point3<f64>, inside_area: f64) {
    let mut obj = box_object();
    let top = top_face(&obj);
    let before = obj.total_area().unwrap();

    let result = obj
        .apply_intersect_contour_to_face(top, clip, Some(5), &Tolerances::default())
        .unwrap();
    assert_eq!(result.inside.len(), 1);
    assert_eq!(result.outside.len(), 1);
    assert_relative_eq!(obj.face_area(result.inside[0]).unwrap(), inside_area, epsilon = 1e-9);
    assert_relative_eq!(
        obj.face_area(result.outside[0]).unwrap(),
        100.0 - inside_area,
        epsilon = 1e-9
    );
    assert_relative_eq!(obj.total_area().unwrap(), before, epsilon = 1e-9);

    let outside = obj.faces().try_get(result.outside[0]).unwrap().clone();
    assert_eq!(outside.inner_loops.len(), 1);
    let shared = obj.find_vertex(&touch).unwrap();
    assert!(obj.closed_contour_vertices(outside.outer_loop).unwrap().contains(&shared));
    assert!(obj.closed_contour_vertices(outside.inner_loops[0]).unwrap().contains(&shared));
    assert_well_formed(&obj);

    let mesh = SbrepToMeshBuilder::new(MeshBuildOptions::default())
        .convert(&obj)
        .unwrap();
    assert_relative_eq!(mesh.surface_area(), before, epsilon = 1e-6);
}

#[test]
fn clip_touching_an_edge_at_one_point() {
    let diamond = [
        Point3::new(5.0, 2.0, 4.0),
        Point3::new(10.0, 5.0, 4.0),
        Point3::new(5.0, 8.0, 4.0),
        Point3::new(2.0, 5.0, 4.0),
    ];
    cut_touching_clip(&diamond, Point3::new(10.0, 5.0, 4.0), 24.0);
}

#[test]
fn clip_touching_a_corner() {
    let triangle = [
        Point3::new(10.0, 10.0, 4.0),
        Point3::new(5.0, 8.0, 4.0),
        Point3::new(8.0, 5.0, 4.0),
    ];
    cut_touching_clip(&triangle, Point3::new(10.0, 10.0, 4.0), 10.5);
}
