// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Contour intersection and difference, checked against i_overlay.

mod common;

use approx::assert_relative_eq;
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use sbrep_geometry::Point2;
use sbrep_topology::{IntersectContour, PointPosition};

use common::rect;

const EPS: f64 = 1e-6;

fn shoelace(path: &[[f64; 2]]) -> f64 {
    let n = path.len();
    (0..n)
        .map(|i| {
            let [x0, y0] = path[i];
            let [x1, y1] = path[(i + 1) % n];
            x0 * y1 - x1 * y0
        })
        .sum::<f64>()
        * 0.5
}

fn to_path(points: &[Point2<f64>]) -> Vec<[f64; 2]> {
    points.iter().map(|p| [p.x, p.y]).collect()
}

/// Area of `subject op clip` computed by i_overlay.
fn oracle_area(subject: &[Vec<Point2<f64>>], clip: &[Point2<f64>], rule: OverlayRule) -> f64 {
    let subject: Vec<Vec<[f64; 2]>> = subject.iter().map(|r| to_path(r)).collect();
    let clip = vec![to_path(clip)];
    let shapes = subject.overlay(&clip, rule, FillRule::EvenOdd);
    shapes
        .iter()
        .map(|shape| {
            shape
                .iter()
                .enumerate()
                .map(|(i, contour)| {
                    let a = shoelace(contour).abs();
                    if i == 0 {
                        a
                    } else {
                        -a
                    }
                })
                .sum::<f64>()
        })
        .sum()
}

fn check_against_oracle(outer: &[Point2<f64>], holes: &[Vec<Point2<f64>>], clip: &[Point2<f64>]) {
    let a = IntersectContour::from_rings(outer, holes, EPS).unwrap();
    let b = IntersectContour::from_ring(clip, EPS).unwrap();

    let mut subject = vec![outer.to_vec()];
    subject.extend(holes.iter().cloned());

    let inter = IntersectContour::intersect(&a, &b, EPS).unwrap();
    let diff = IntersectContour::difference(&a, &b, EPS).unwrap();
    assert_relative_eq!(
        inter.area().unwrap(),
        oracle_area(&subject, clip, OverlayRule::Intersect),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        diff.area().unwrap(),
        oracle_area(&subject, clip, OverlayRule::Difference),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        inter.area().unwrap() + diff.area().unwrap(),
        a.area().unwrap(),
        epsilon = 1e-9
    );
}

#[test]
fn self_intersection_and_difference() {
    let a = IntersectContour::from_ring(
        &[
            Point2::new(0.0, 0.0),
            Point2::new(5.0, 0.0),
            Point2::new(5.0, 1.0),
            Point2::new(1.0, 1.0),
            Point2::new(1.0, 4.0),
            Point2::new(0.0, 4.0),
        ],
        EPS,
    )
    .unwrap();

    let inter = IntersectContour::intersect(&a, &a, EPS).unwrap();
    assert_eq!(inter.point_count(), a.point_count());
    assert_eq!(inter.edge_count(), a.edge_count());
    assert_relative_eq!(inter.area().unwrap(), 8.0, epsilon = 1e-12);

    let diff = IntersectContour::difference(&a, &a, EPS).unwrap();
    assert!(diff.area().unwrap().abs() < 1e-12);
}

#[test]
fn containment_gives_clip_and_framed_remainder() {
    let outer = IntersectContour::from_ring(&rect(0.0, 0.0, 10.0, 10.0), EPS).unwrap();
    let clip = IntersectContour::from_ring(&rect(2.0, 2.0, 8.0, 8.0), EPS).unwrap();

    let inter = IntersectContour::intersect(&outer, &clip, EPS).unwrap();
    let diff = IntersectContour::difference(&outer, &clip, EPS).unwrap();
    assert_relative_eq!(inter.area().unwrap(), 36.0, epsilon = 1e-9);
    assert_relative_eq!(diff.area().unwrap(), 64.0, epsilon = 1e-9);

    let rings = diff.rings().unwrap();
    assert_eq!(rings.len(), 2);
    let mut areas: Vec<f64> = rings.iter().map(|r| r.area()).collect();
    areas.sort_by(f64::total_cmp);
    assert_relative_eq!(areas[0], -36.0, epsilon = 1e-9);
    assert_relative_eq!(areas[1], 100.0, epsilon = 1e-9);
}

#[test]
fn rotated_square_matches_oracle() {
    let diamond = [
        Point2::new(3.5, 0.3),
        Point2::new(5.7, 2.5),
        Point2::new(3.5, 4.7),
        Point2::new(1.3, 2.5),
    ];
    check_against_oracle(&rect(0.0, 0.0, 4.0, 4.0), &[], &diamond);
}

#[test]
fn concave_subject_matches_oracle() {
    let l_shape = [
        Point2::new(0.0, 0.0),
        Point2::new(6.0, 0.0),
        Point2::new(6.0, 2.0),
        Point2::new(2.0, 2.0),
        Point2::new(2.0, 6.0),
        Point2::new(0.0, 6.0),
    ];
    check_against_oracle(&l_shape, &[], &rect(1.0, 1.0, 4.0, 4.5));
}

#[test]
fn subject_with_hole_matches_oracle() {
    check_against_oracle(
        &rect(0.0, 0.0, 10.0, 10.0),
        &[rect(3.0, 3.0, 7.0, 7.0)],
        &rect(5.0, 1.0, 12.0, 5.5),
    );
}

#[test]
fn triangle_clip_matches_oracle() {
    let triangle = [
        Point2::new(-1.0, 1.5),
        Point2::new(6.3, 2.2),
        Point2::new(2.1, 7.9),
    ];
    check_against_oracle(&rect(0.0, 0.0, 5.0, 5.0), &[], &triangle);
}

#[test]
fn half_epsilon_from_a_vertex_is_on_vertex() {
    let c = IntersectContour::from_ring(&rect(0.0, 0.0, 10.0, 10.0), EPS).unwrap();
    let corner = c.find_point(&Point2::new(10.0, 10.0), EPS).unwrap();
    let near_corner = Point2::new(10.0 - EPS / 2.0, 10.0);
    assert_eq!(c.calc_point_position(&near_corner, EPS), PointPosition::OnVertex(corner));
    assert_eq!(
        c.calc_point_position(&Point2::new(5.0, 10.0 - EPS / 2.0), EPS),
        c.calc_point_position(&Point2::new(5.0, 10.0), EPS)
    );
}
