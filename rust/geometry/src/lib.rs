//! SBRep Geometry
//!
//! Geometric kernel shared by the SBRep crates: indexed triangle meshes with
//! edge adjacency, plane frames, 2D predicates on segments and polygons, and
//! earcutr-based triangulation of planar regions.

pub mod error;
pub mod geometry2d;
pub mod mesh;
pub mod transform;
pub mod triangulation;

// Re-export nalgebra types for convenience
pub use nalgebra::{Point2, Point3, Vector2, Vector3};

pub use error::{Error, Result};
pub use geometry2d::{Interposition, PointLocation};
pub use mesh::{Mesh, MeshEdge, MeshTopology};
pub use transform::{Plane, PlaneTransform};
pub use triangulation::{triangulate_polygon, EarcutTriangulator, Triangulation, Triangulator};
