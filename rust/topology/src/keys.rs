// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Identifier types.
//!
//! B-Rep entities are addressed by positive integer IDs handed out by an
//! [`IndexedCollection`](crate::collection::IndexedCollection). IDs are
//! assigned in insertion order and never reused within one object, so they
//! survive serialization unchanged.
//!
//! Contour graphs used by the 2D boolean engine are short-lived and use
//! `slotmap` keys instead.

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

/// Common behaviour of the typed entity IDs.
pub trait EntityId:
    Copy + Eq + Ord + Hash + fmt::Debug + fmt::Display + Into<TopologyKey>
{
    /// Entity type addressed by this ID.
    const TYPE: TopologyType;

    /// Wraps a raw value; `0` is never a valid ID.
    fn from_raw(raw: u32) -> Self;

    fn raw(self) -> u32;
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident => $variant:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl EntityId for $name {
            const TYPE: TopologyType = TopologyType::$variant;

            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            fn raw(self) -> u32 {
                self.0
            }
        }

        impl From<$name> for TopologyKey {
            fn from(id: $name) -> Self {
                TopologyKey::$variant(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id! {
    /// ID of a vertex (point in 3D space).
    VertexId => Vertex
}

entity_id! {
    /// ID of an edge (segment between two vertices).
    EdgeId => Edge
}

entity_id! {
    /// ID of a verge (simple polyline of edges between two planar regions).
    VergeId => Verge
}

entity_id! {
    /// ID of a loop (closed cycle of verges).
    LoopId => Loop
}

entity_id! {
    /// ID of a face (planar region with one outer loop and holes).
    FaceId => Face
}

new_key_type! {
    /// Key for a point of an [`IntersectContour`](crate::intersect::IntersectContour).
    pub struct PointKey;

    /// Key for an edge of an [`IntersectContour`](crate::intersect::IntersectContour).
    pub struct SegmentKey;
}

/// An ID that can reference any B-Rep entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyKey {
    Vertex(VertexId),
    Edge(EdgeId),
    Verge(VergeId),
    Loop(LoopId),
    Face(FaceId),
}

impl TopologyKey {
    /// Returns the topology type of this key.
    pub fn topology_type(&self) -> TopologyType {
        match self {
            TopologyKey::Vertex(_) => TopologyType::Vertex,
            TopologyKey::Edge(_) => TopologyType::Edge,
            TopologyKey::Verge(_) => TopologyType::Verge,
            TopologyKey::Loop(_) => TopologyType::Loop,
            TopologyKey::Face(_) => TopologyType::Face,
        }
    }

    /// Raw integer value of the wrapped ID.
    pub fn raw(&self) -> u32 {
        match *self {
            TopologyKey::Vertex(id) => id.0,
            TopologyKey::Edge(id) => id.0,
            TopologyKey::Verge(id) => id.0,
            TopologyKey::Loop(id) => id.0,
            TopologyKey::Face(id) => id.0,
        }
    }
}

impl fmt::Display for TopologyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.topology_type(), self.raw())
    }
}

/// Discriminant for B-Rep entity types, ordered bottom-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TopologyType {
    Vertex = 0,
    Edge = 1,
    Verge = 2,
    Loop = 3,
    Face = 4,
}

impl TopologyType {
    /// Returns the type name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TopologyType::Vertex => "Vertex",
            TopologyType::Edge => "Edge",
            TopologyType::Verge => "Verge",
            TopologyType::Loop => "Loop",
            TopologyType::Face => "Face",
        }
    }
}

impl fmt::Display for TopologyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
