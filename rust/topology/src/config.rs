// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tolerances and reconstruction options.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Numeric tolerances shared by construction, contour booleans and
/// reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    /// Absolute distance under which two points are the same point.
    pub epsilon: f64,
    /// Decimal digits kept when rounding triangle normals into buckets.
    pub normal_digits: u32,
    /// Component-wise tolerance between two rounded normals.
    pub normal_epsilon: f64,
    /// Vertex merge distance for reconstruction, as a fraction of the
    /// object's bounding-box diagonal. Never below `epsilon`.
    pub merge_tolerance: f64,
    /// Iteration cap for loop recovery from loose edges.
    pub max_loop_repair_iterations: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            epsilon: 1e-6,
            normal_digits: 4,
            normal_epsilon: 1e-4,
            merge_tolerance: 1e-9,
            max_loop_repair_iterations: 32,
        }
    }
}

impl Tolerances {
    /// Rounds a normal to `normal_digits` decimals.
    pub fn round_normal(&self, normal: &Vector3<f64>) -> Vector3<f64> {
        let scale = 10f64.powi(self.normal_digits as i32);
        normal.map(|c| (c * scale).round() / scale)
    }

    /// Component-wise normal comparison with `normal_epsilon`.
    pub fn normals_equal(&self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        (a - b).amax() <= self.normal_epsilon
    }

    /// Absolute merge distance for an object whose bounding-box diagonal is
    /// `diagonal`. Never drops below `epsilon`.
    pub fn merge_distance(&self, diagonal: f64) -> f64 {
        (self.merge_tolerance * diagonal).max(self.epsilon)
    }
}

/// How reconstruction deduplicates vertices across faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategy {
    /// Scan every emitted vertex (quadratic).
    Global,
    /// B-Rep vertex identity, then the vertices of neighbouring faces, then a
    /// rounded-coordinate bucket.
    #[default]
    Neighbourhood,
}

/// Options for [`SbrepToMeshBuilder`](crate::to_mesh::SbrepToMeshBuilder).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshBuildOptions {
    pub strategy: MergeStrategy,
    pub tolerances: Tolerances,
    /// Flip triangles whose winding disagrees with the face normal.
    pub fix_normals: bool,
}

impl Default for MeshBuildOptions {
    fn default() -> Self {
        Self {
            strategy: MergeStrategy::default(),
            tolerances: Tolerances::default(),
            fix_normals: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_absorbs_float_noise() {
        let tol = Tolerances::default();
        let a = tol.round_normal(&Vector3::new(0.0, 0.0, 0.999_999_97));
        let b = tol.round_normal(&Vector3::new(1e-9, -2e-9, 1.0));
        assert!(tol.normals_equal(&a, &b));
        assert!(!tol.normals_equal(&a, &Vector3::new(0.0, 0.01, 1.0)));
    }

    #[test]
    fn merge_distance_is_scale_relative() {
        let tol = Tolerances::default();
        assert!((tol.merge_distance(1e6) - 1e-3).abs() < 1e-15);
        assert_eq!(tol.merge_distance(100.0), tol.epsilon);
        assert_eq!(tol.merge_distance(0.0), tol.epsilon);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let tol: Tolerances = serde_json::from_str(r#"{"epsilon": 0.001}"#).unwrap();
        assert_eq!(tol.epsilon, 0.001);
        assert_eq!(tol.normal_digits, 4);
        let opts: MeshBuildOptions = serde_json::from_str(r#"{"strategy": "global"}"#).unwrap();
        assert_eq!(opts.strategy, MergeStrategy::Global);
        assert!(opts.fix_normals);
    }
}
