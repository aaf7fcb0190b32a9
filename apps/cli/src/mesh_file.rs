// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON triangle mesh files.

use anyhow::{ensure, Result};
use sbrep_geometry::{Mesh, Point3};
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshFile {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<[u32; 3]>,
    /// Per-triangle face group; missing means group 0 everywhere.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<i32>,
    /// Per-triangle normals, written for reconstructed meshes only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normals: Vec<[f64; 3]>,
}

impl MeshFile {
    pub fn to_mesh(&self) -> Result<Mesh> {
        ensure!(
            self.groups.is_empty() || self.groups.len() == self.indices.len(),
            "{} groups for {} triangles",
            self.groups.len(),
            self.indices.len()
        );
        let mut mesh = Mesh::with_capacity(self.positions.len(), self.indices.len());
        for &p in &self.positions {
            mesh.add_vertex(Point3::from(p));
        }
        for (t, &[a, b, c]) in self.indices.iter().enumerate() {
            for i in [a, b, c] {
                ensure!(
                    (i as usize) < self.positions.len(),
                    "triangle {t} references vertex {i} of {}",
                    self.positions.len()
                );
            }
            mesh.add_triangle(a, b, c, self.groups.get(t).copied().unwrap_or(0));
        }
        Ok(mesh)
    }

    pub fn from_mesh(mesh: &Mesh) -> Self {
        Self {
            positions: mesh.positions.iter().map(|p| [p.x, p.y, p.z]).collect(),
            indices: mesh.indices.clone(),
            groups: mesh.groups.clone(),
            normals: mesh.normals.iter().map(|n| [n.x, n.y, n.z]).collect(),
        }
    }
}
