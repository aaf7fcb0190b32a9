// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during geometry processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Triangulation failed: {0}")]
    TriangulationError(String),

    /// The predicate was asked about degenerate input (zero-length segment).
    #[error("Invalid geometric query: {0}")]
    InvalidQuery(String),

    /// The predicate could not produce a result (non-finite coordinates).
    #[error("Geometric query not computed: {0}")]
    NotComputed(String),

    #[error("Non-manifold edge ({0}, {1}): shared by more than two triangles")]
    NonManifoldEdge(u32, u32),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),
}
