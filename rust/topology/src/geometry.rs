// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Geometric queries on B-Rep entities.
//!
//! Areas are measured in the face's own plane frame, so they are exact for
//! planar faces regardless of orientation in space.

use nalgebra::{Point2, Point3, Vector3};
use sbrep_geometry::geometry2d::area_signed;
use sbrep_geometry::PlaneTransform;

use crate::arena::SbrepObject;
use crate::error::{Error, Result};
use crate::keys::*;

impl SbrepObject {
    /// Returns the position of a vertex.
    pub fn vertex_point(&self, id: VertexId) -> Result<Point3<f64>> {
        Ok(self.vertices.try_get(id)?.point)
    }

    /// Computes the Euclidean length of an edge.
    pub fn edge_length(&self, id: EdgeId) -> Result<f64> {
        let (a, b) = self.edge_vertices(id)?;
        Ok((self.vertex_point(b)? - self.vertex_point(a)?).norm())
    }

    /// Loop corner positions in walking order.
    pub fn loop_points(&self, id: LoopId) -> Result<Vec<Point3<f64>>> {
        self.closed_contour_vertices(id)?
            .into_iter()
            .map(|v| self.vertex_point(v))
            .collect()
    }

    /// Plane frame of a face, anchored at the first vertex of its outer loop.
    pub fn face_transform(&self, id: FaceId) -> Result<PlaneTransform> {
        let face = self.faces.try_get(id)?;
        let origin = self
            .closed_contour_vertices(face.outer_loop)?
            .first()
            .map(|&v| self.vertex_point(v))
            .transpose()?
            .ok_or_else(|| Error::OpenLoop(format!("outer loop of face {id} is empty")))?;
        Ok(PlaneTransform::calculate(origin, &face.plane.normal))
    }

    /// Loop corners projected into a plane frame.
    pub fn loop_points_2d(&self, id: LoopId, frame: &PlaneTransform) -> Result<Vec<Point2<f64>>> {
        Ok(frame.project_all(&self.loop_points(id)?))
    }

    /// Signed area of a loop around `normal`; positive when the walk is
    /// counter-clockwise.
    pub fn loop_area(&self, id: LoopId, normal: &Vector3<f64>) -> Result<f64> {
        let points = self.loop_points(id)?;
        let Some(&origin) = points.first() else {
            return Ok(0.0);
        };
        let frame = PlaneTransform::calculate(origin, normal);
        Ok(area_signed(&frame.project_all(&points)))
    }

    /// Area of a face: outer loop minus its holes.
    pub fn face_area(&self, id: FaceId) -> Result<f64> {
        let face = self.faces.try_get(id)?;
        let normal = face.plane.normal;
        let mut area = self.loop_area(face.outer_loop, &normal)?.abs();
        for &l in &face.inner_loops {
            area -= self.loop_area(l, &normal)?.abs();
        }
        Ok(area)
    }

    /// Sum of all face areas.
    pub fn total_area(&self) -> Result<f64> {
        self.faces.ids().map(|f| self.face_area(f)).sum()
    }

    /// Axis-aligned bounds of all vertices.
    pub fn bounds(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let mut points = self.vertices.values().map(|v| v.point);
        let first = points.next()?;
        Some(points.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }

    /// Length of the bounding-box diagonal; zero for an empty object.
    pub fn diagonal(&self) -> f64 {
        self.bounds().map_or(0.0, |(min, max)| (max - min).norm())
    }

    /// Makes the largest-area loop of every face its outer loop.
    pub fn define_faces_outside_loop(&mut self) -> Result<()> {
        let ids: Vec<FaceId> = self.faces.ids().collect();
        for id in ids {
            self.define_face_outside_loop(id)?;
        }
        Ok(())
    }

    /// Among the loops of one face, designates the loop enclosing the
    /// largest planar area as the outer loop; the others become holes.
    pub fn define_face_outside_loop(&mut self, id: FaceId) -> Result<()> {
        let face = self.faces.try_get(id)?;
        let normal = face.plane.normal;
        let loops: Vec<LoopId> = face.loops().collect();

        let mut best = (face.outer_loop, f64::NEG_INFINITY);
        for &l in &loops {
            let area = self.loop_area(l, &normal)?.abs();
            if area > best.1 {
                best = (l, area);
            }
        }

        let face = self.faces.try_get_mut(id)?;
        face.outer_loop = best.0;
        face.inner_loops = loops.into_iter().filter(|&l| l != best.0).collect();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sbrep_geometry::Plane;

    fn ring(obj: &mut SbrepObject, corners: &[(f64, f64)]) -> LoopId {
        let v: Vec<VertexId> = corners
            .iter()
            .map(|&(x, y)| obj.add_vertex(Point3::new(x, 0.0, y)))
            .collect();
        let edges: Vec<EdgeId> = (0..v.len())
            .map(|i| obj.add_edge(v[i], v[(i + 1) % v.len()]).unwrap())
            .collect();
        let verge = obj.add_verge(&edges).unwrap();
        obj.add_loop(&[verge]).unwrap()
    }

    #[test]
    fn outer_loop_is_largest_regardless_of_input_order() {
        let mut obj = SbrepObject::new();
        let hole = ring(&mut obj, &[(2., 2.), (8., 2.), (8., 8.), (2., 8.)]);
        let outer = ring(&mut obj, &[(0., 0.), (10., 0.), (10., 10.), (0., 10.)]);
        let plane = Plane::from_point_normal(&Point3::origin(), &Vector3::y());
        let f = obj.add_face(3, plane, hole, &[outer]).unwrap();

        obj.define_faces_outside_loop().unwrap();
        let face = obj.faces().try_get(f).unwrap();
        assert_eq!(face.outer_loop, outer);
        assert_eq!(face.inner_loops, vec![hole]);
        assert_relative_eq!(obj.face_area(f).unwrap(), 64.0, epsilon = 1e-9);
    }

    #[test]
    fn vertical_face_area_and_bounds() {
        let mut obj = SbrepObject::new();
        let l = ring(&mut obj, &[(0., 0.), (3., 0.), (3., 4.), (0., 4.)]);
        assert_relative_eq!(obj.loop_area(l, &Vector3::y()).unwrap().abs(), 12.0, epsilon = 1e-9);
        let (min, max) = obj.bounds().unwrap();
        assert_eq!(min, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(max, Point3::new(3.0, 0.0, 4.0));
        assert_relative_eq!(obj.diagonal(), 5.0);
        assert_relative_eq!(obj.edge_length(EdgeId(2)).unwrap(), 4.0);
    }
}
