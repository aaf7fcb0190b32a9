// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! 2D contour booleans.
//!
//! An [`IntersectContour`] is a small planar graph of points and directed
//! edges. Closed regions keep their interior on the left of every edge:
//! outer rings run counter-clockwise, holes clockwise.
//!
//! A boolean between two contours runs in four phases:
//!
//! 1. Both operands are split at every mutual crossing, so that afterwards
//!    each edge of one contour lies entirely inside, outside, or along the
//!    boundary of the other.
//! 2. Every point is classified against the other contour
//!    ([`PointPosition`]).
//! 3. Every edge is classified from its endpoints, falling back to a
//!    midpoint test when both endpoints sit on the other boundary
//!    ([`EdgePosition`]).
//! 4. Edges are selected by operation and written into a fresh contour,
//!    whose point incidence is then rebuilt.
//!
//! The result is walked with [`IntersectContour::edges_walk`] or split into
//! rings with [`IntersectContour::rings`].

mod boolean;
mod contour;
mod walk;

pub use boolean::BooleanOp;
pub use contour::{
    ContourEdge, ContourPoint, Crossing, CrossingKind, EdgePosition, IntersectContour,
    PointPosition,
};
pub use walk::{ContourPoints, ContourWalk, Ring, WalkStep};
