// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Plane equations and plane-local coordinate frames.
//!
//! Every planar face is processed in its own 2D frame: points are projected
//! onto the frame's axes, handled by the 2D predicates or the triangulator,
//! and lifted back onto the plane.

use nalgebra::{Point2, Point3, Vector3};

/// Plane `Ax + By + Cz + D = 0` with its unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Builds the plane through `point` with the given normal.
    ///
    /// The normal is normalized; a zero normal yields a zero plane.
    pub fn from_point_normal(point: &Point3<f64>, normal: &Vector3<f64>) -> Self {
        let n = normal.try_normalize(1e-15).unwrap_or_else(Vector3::zeros);
        Self {
            a: n.x,
            b: n.y,
            c: n.z,
            d: -n.dot(&point.coords),
            normal: n,
        }
    }

    /// Signed distance of a point from the plane.
    #[inline]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.a * point.x + self.b * point.y + self.c * point.z + self.d
    }
}

/// Orthonormal right-handed frame on a plane.
///
/// `u × v = normal`, so counter-clockwise winding in local 2D coordinates is
/// counter-clockwise around the normal in 3D.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneTransform {
    pub origin: Point3<f64>,
    pub u_axis: Vector3<f64>,
    pub v_axis: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl PlaneTransform {
    /// Builds the frame for the plane through `point_on_contour` with `normal`.
    ///
    /// The tangent reference is the world axis least aligned with the normal,
    /// which keeps the cross products away from degeneracy and makes the
    /// frame deterministic for a given normal.
    pub fn calculate(point_on_contour: Point3<f64>, normal: &Vector3<f64>) -> Self {
        let normal = normal.try_normalize(1e-15).unwrap_or_else(Vector3::z);

        let abs_x = normal.x.abs();
        let abs_y = normal.y.abs();
        let abs_z = normal.z.abs();

        let reference = if abs_x <= abs_y && abs_x <= abs_z {
            Vector3::new(1.0, 0.0, 0.0)
        } else if abs_y <= abs_z {
            Vector3::new(0.0, 1.0, 0.0)
        } else {
            Vector3::new(0.0, 0.0, 1.0)
        };

        let u_axis = normal.cross(&reference).normalize();
        let v_axis = normal.cross(&u_axis).normalize();

        Self {
            origin: point_on_contour,
            u_axis,
            v_axis,
            normal,
        }
    }

    /// Projects a world point into local 2D coordinates (height is dropped).
    #[inline]
    pub fn to_local(&self, point: &Point3<f64>) -> Point2<f64> {
        let v = point - self.origin;
        Point2::new(v.dot(&self.u_axis), v.dot(&self.v_axis))
    }

    /// Lifts a local 2D point back onto the plane in world coordinates.
    #[inline]
    pub fn to_world(&self, point: &Point2<f64>) -> Point3<f64> {
        self.origin + self.u_axis * point.x + self.v_axis * point.y
    }

    /// Projects a list of world points.
    pub fn project_all(&self, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points.iter().map(|p| self.to_local(p)).collect()
    }
}
