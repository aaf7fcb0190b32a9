// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for B-Rep operations.
//!
//! Every variant is fatal: construction and contour application either leave
//! a consistent object or fail, never a partially updated one.

use crate::keys::{EdgeId, FaceId, LoopId, TopologyKey, VergeId, VertexId};

/// Result type alias for B-Rep operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during B-Rep operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced entity was not found in its collection.
    #[error("topology entity not found: {0}")]
    NotFound(TopologyKey),

    /// An explicit ID was already taken (or zero) when inserting.
    #[error("topology id already in use or invalid: {0}")]
    IdOccupied(TopologyKey),

    /// A mesh edge with no triangle on either side.
    #[error("object not closed: mesh edge ({0}, {1}) has no adjacent planar group")]
    OpenMesh(u32, u32),

    /// A planar group produced no boundary loop.
    #[error("group integrity violated: planar group {0} has no boundary")]
    GroupIntegrity(usize),

    /// A point/edge graph with a vertex of odd degree (other than a chain end).
    #[error("cannot traverse graph: {0}")]
    NotTraversable(String),

    /// A verge whose edges branch at a vertex.
    #[error("verge edges branch at vertex {0}")]
    BranchingVerge(VertexId),

    /// A verge whose edges do not form one connected chain.
    #[error("verge edges are not connected")]
    DisconnectedVerge,

    /// A loop whose edges are not one closed, non-branching cycle.
    #[error("loop is not closed: {0}")]
    OpenLoop(String),

    /// An edge that already belongs to another verge.
    #[error("edge {edge} already belongs to verge {verge}")]
    EdgeAlreadyAssigned { edge: EdgeId, verge: VergeId },

    /// Removing a loop that is still the outer boundary of a face.
    #[error("loop {loop_id} is the outer loop of face {face}")]
    LoopInUse { loop_id: LoopId, face: FaceId },

    /// An edge whose endpoints coincide.
    #[error("degenerate edge at vertex {0}")]
    DegenerateEdge(VertexId),

    /// A split point that does not land on the boundary of the other contour.
    #[error("inconsistent contour split: {0}")]
    InconsistentSplit(String),

    /// An edge whose position against the other contour cannot be decided.
    #[error("ambiguous edge classification: {0}")]
    AmbiguousEdge(String),

    /// A contour with too few distinct points or zero area.
    #[error("degenerate contour: {0}")]
    DegenerateContour(String),

    /// Loop recovery did not reach a fixed point within the iteration cap.
    #[error("loop repair did not converge after {0} iterations")]
    LoopRepairExhausted(usize),

    /// Malformed text input.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure reported by a geometric predicate, the mesh collaborator or
    /// the triangulator.
    #[error(transparent)]
    Geometry(#[from] sbrep_geometry::Error),
}
