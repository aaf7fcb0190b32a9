// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # SBRep Topology
//!
//! Planar boundary representation (B-Rep) reconstructed from triangle meshes.
//!
//! A [`SbrepObject`] stores vertices, edges, verges, loops and faces in
//! [`IndexedCollection`]s addressed by stable integer IDs, with child lists
//! on every entity and parent sets kept in sync by the construction
//! primitives.
//!
//! - [`SbrepBuilder`] turns a closed (or bordered) triangle mesh into
//!   planar faces: coplanar triangles are grouped, group boundaries become
//!   verges and verges are stitched into loops.
//! - [`IntersectContour`] is a 2D point/edge graph with point and edge
//!   classification and intersection/difference of closed contours.
//! - [`SbrepObject::apply_intersect_contour_to_face`] cuts a face with a
//!   contour and rewrites the affected topology.
//! - [`SbrepToMeshBuilder`] triangulates every face back into a mesh,
//!   optionally in parallel.
//!
//! ```
//! use sbrep_geometry::{Mesh, Point3};
//! use sbrep_topology::SbrepBuilder;
//!
//! // A single quad made of two triangles.
//! let mut mesh = Mesh::new();
//! let a = mesh.add_vertex(Point3::new(0.0, 0.0, 0.0));
//! let b = mesh.add_vertex(Point3::new(1.0, 0.0, 0.0));
//! let c = mesh.add_vertex(Point3::new(1.0, 1.0, 0.0));
//! let d = mesh.add_vertex(Point3::new(0.0, 1.0, 0.0));
//! mesh.add_triangle(a, b, c, 0);
//! mesh.add_triangle(a, c, d, 0);
//!
//! let obj = SbrepBuilder::default().convert(&mesh).unwrap();
//! assert_eq!(obj.face_count(), 1);
//! assert!((obj.total_area().unwrap() - 1.0).abs() < 1e-9);
//! ```

pub mod apply;
pub mod arena;
pub mod builder;
pub mod collection;
pub mod config;
pub mod construction;
pub mod error;
pub mod feedbacks;
pub mod geometry;
pub mod intersect;
pub mod keys;
pub mod serialization;
pub mod to_mesh;
pub mod traversal;

pub use apply::ApplyResult;
pub use arena::{EdgeData, FaceData, LoopData, SbrepObject, VergeData, VertexData};
pub use builder::{LoopBuild, PlanarGroup, SbrepBuilder};
pub use collection::IndexedCollection;
pub use config::{MergeStrategy, MeshBuildOptions, Tolerances};
pub use construction::EdgeSplit;
pub use error::{Error, Result};
pub use intersect::{
    BooleanOp, ContourEdge, ContourPoint, EdgePosition, IntersectContour, PointPosition, Ring,
};
pub use keys::{
    EdgeId, EntityId, FaceId, LoopId, PointKey, SegmentKey, TopologyKey, TopologyType, VergeId,
    VertexId,
};
pub use serialization::ObjectSnapshot;
pub use to_mesh::{FacePatch, SbrepToMeshBuilder};
