// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Persistence for B-Rep objects.
//!
//! Two formats are supported:
//!
//! * a line-oriented text format that round-trips IDs exactly:
//!
//!   ```text
//!   vertices <n>
//!   <id> <x> <y> <z>
//!   edges <n>
//!   <id> <vertex-a> <vertex-b>
//!   verges <n>
//!   <id> <edge-count> <edge-id>...
//!   loops <n>
//!   <id> <verge-count> <verge-id>...
//!   faces <n>
//!   <id> <group> <outer-loop> <hole-count> <hole-id>... <A> <B> <C> <D> <nx> <ny> <nz>
//!   ```
//!
//!   Tokens are separated by any whitespace, blank lines are skipped and
//!   floats always use `.` as the decimal separator. Parent references are
//!   not stored; they are rebuilt after reading.
//!
//! * a JSON snapshot through serde, for tooling.

use std::io::{BufRead, Write};

use nalgebra::{Point3, Vector3};
use rustc_hash::FxHashSet;
use sbrep_geometry::Plane;
use serde::{Deserialize, Serialize};

use crate::arena::*;
use crate::error::{Error, Result};
use crate::keys::*;

impl SbrepObject {
    /// Writes the text format.
    pub fn write_text<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "vertices {}", self.vertices.len())?;
        for (id, v) in self.vertices.iter() {
            writeln!(out, "{} {} {} {}", id, v.point.x, v.point.y, v.point.z)?;
        }

        writeln!(out, "edges {}", self.edges.len())?;
        for (id, e) in self.edges.iter() {
            writeln!(out, "{} {} {}", id, e.v1, e.v2)?;
        }

        writeln!(out, "verges {}", self.verges.len())?;
        for (id, v) in self.verges.iter() {
            write!(out, "{} {}", id, v.edges.len())?;
            for e in &v.edges {
                write!(out, " {e}")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "loops {}", self.loops.len())?;
        for (id, l) in self.loops.iter() {
            write!(out, "{} {}", id, l.verges.len())?;
            for v in &l.verges {
                write!(out, " {v}")?;
            }
            writeln!(out)?;
        }

        writeln!(out, "faces {}", self.faces.len())?;
        for (id, f) in self.faces.iter() {
            write!(
                out,
                "{} {} {} {}",
                id,
                f.group_id,
                f.outer_loop,
                f.inner_loops.len()
            )?;
            for l in &f.inner_loops {
                write!(out, " {l}")?;
            }
            let p = &f.plane;
            writeln!(
                out,
                " {} {} {} {} {} {} {}",
                p.a, p.b, p.c, p.d, p.normal.x, p.normal.y, p.normal.z
            )?;
        }
        Ok(())
    }

    /// Text format as a string.
    pub fn to_text(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_text(&mut buf)?;
        String::from_utf8(buf).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Reads the text format. `epsilon` becomes the object's coincidence
    /// distance; stored vertices are not merged.
    pub fn read_text<R: BufRead>(input: R, epsilon: f64) -> Result<Self> {
        let mut reader = TextReader::new(input);
        let mut obj = SbrepObject::with_epsilon(epsilon);

        for _ in 0..reader.section("vertices")? {
            let mut rec = reader.record()?;
            let id = VertexId(rec.id()?);
            let point = Point3::new(rec.float()?, rec.float()?, rec.float()?);
            rec.finish()?;
            obj.vertices.insert_with_id(
                id,
                VertexData {
                    point,
                    parents: FxHashSet::default(),
                },
            )?;
            obj.grid_insert(id, &point);
        }

        for _ in 0..reader.section("edges")? {
            let mut rec = reader.record()?;
            let id = EdgeId(rec.id()?);
            let v1 = VertexId(rec.id()?);
            let v2 = VertexId(rec.id()?);
            rec.finish()?;
            for v in [v1, v2] {
                rec.require(obj.vertices.contains(v), v)?;
            }
            if v1 == v2 {
                return Err(Error::DegenerateEdge(v1));
            }
            obj.edges.insert_with_id(id, EdgeData { v1, v2, parent: None })?;
        }

        for _ in 0..reader.section("verges")? {
            let mut rec = reader.record()?;
            let id = VergeId(rec.id()?);
            let edges: Vec<EdgeId> = rec.id_list()?.into_iter().map(EdgeId).collect();
            rec.finish()?;
            for &e in &edges {
                rec.require(obj.edges.contains(e), e)?;
            }
            obj.verges.insert_with_id(
                id,
                VergeData {
                    edges,
                    parents: FxHashSet::default(),
                },
            )?;
        }

        for _ in 0..reader.section("loops")? {
            let mut rec = reader.record()?;
            let id = LoopId(rec.id()?);
            let verges: Vec<VergeId> = rec.id_list()?.into_iter().map(VergeId).collect();
            rec.finish()?;
            for &v in &verges {
                rec.require(obj.verges.contains(v), v)?;
            }
            obj.loops.insert_with_id(
                id,
                LoopData {
                    verges,
                    parents: FxHashSet::default(),
                },
            )?;
        }

        for _ in 0..reader.section("faces")? {
            let mut rec = reader.record()?;
            let id = FaceId(rec.id()?);
            let group_id = rec.int()?;
            let outer_loop = LoopId(rec.id()?);
            let inner_loops: Vec<LoopId> = rec.id_list()?.into_iter().map(LoopId).collect();
            let plane = Plane {
                a: rec.float()?,
                b: rec.float()?,
                c: rec.float()?,
                d: rec.float()?,
                normal: Vector3::new(rec.float()?, rec.float()?, rec.float()?),
            };
            rec.finish()?;
            for l in std::iter::once(outer_loop).chain(inner_loops.iter().copied()) {
                rec.require(obj.loops.contains(l), l)?;
            }
            obj.faces.insert_with_id(
                id,
                FaceData {
                    group_id,
                    plane,
                    outer_loop,
                    inner_loops,
                },
            )?;
        }

        reader.expect_end()?;
        obj.redefine_feedbacks();
        tracing::debug!(
            vertices = obj.vertex_count(),
            faces = obj.face_count(),
            "read B-Rep text"
        );
        Ok(obj)
    }

    /// Parses the text format with the default tolerance.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::read_text(text.as_bytes(), crate::config::Tolerances::default().epsilon)
    }
}

/// Line reader that skips blank lines and tracks line numbers.
struct TextReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> TextReader<R> {
    fn new(input: R) -> Self {
        Self {
            lines: input.lines(),
            line: 0,
        }
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        for text in self.lines.by_ref() {
            let text = text?;
            self.line += 1;
            if !text.trim().is_empty() {
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    /// Reads a `<name> <count>` header.
    fn section(&mut self, name: &str) -> Result<usize> {
        let text = self
            .next_line()?
            .ok_or_else(|| self.error(format!("expected `{name}` section")))?;
        let mut tokens = text.split_whitespace();
        if tokens.next() != Some(name) {
            return Err(self.error(format!("expected `{name}` section")));
        }
        let count = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| self.error(format!("missing `{name}` count")))?;
        if tokens.next().is_some() {
            return Err(self.error("trailing tokens after section count"));
        }
        Ok(count)
    }

    fn record(&mut self) -> Result<Record> {
        let text = self
            .next_line()?
            .ok_or_else(|| self.error("unexpected end of input"))?;
        Ok(Record {
            line: self.line,
            tokens: text.split_whitespace().map(str::to_owned).collect(),
            pos: 0,
        })
    }

    fn expect_end(&mut self) -> Result<()> {
        match self.next_line()? {
            Some(_) => Err(self.error("unexpected content after faces")),
            None => Ok(()),
        }
    }
}

/// Tokens of one record line.
struct Record {
    line: usize,
    tokens: Vec<String>,
    pos: usize,
}

impl Record {
    fn error(&self, message: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line,
            message: message.into(),
        }
    }

    fn token(&mut self) -> Result<String> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token.ok_or_else(|| self.error("record is too short"))
    }

    fn parse<T: std::str::FromStr>(&mut self, what: &str) -> Result<T> {
        let t = self.token()?;
        t.parse()
            .map_err(|_| self.error(format!("invalid {what} `{t}`")))
    }

    fn id(&mut self) -> Result<u32> {
        match self.parse::<u32>("id")? {
            0 => Err(self.error("id 0 is reserved")),
            id => Ok(id),
        }
    }

    fn int(&mut self) -> Result<i32> {
        self.parse("integer")
    }

    fn float(&mut self) -> Result<f64> {
        self.parse("number")
    }

    /// A count followed by that many ids.
    fn id_list(&mut self) -> Result<Vec<u32>> {
        let count: usize = self.parse("count")?;
        (0..count).map(|_| self.id()).collect()
    }

    fn finish(&self) -> Result<()> {
        if self.pos == self.tokens.len() {
            Ok(())
        } else {
            Err(self.error("trailing tokens in record"))
        }
    }

    fn require(&self, present: bool, id: impl std::fmt::Display) -> Result<()> {
        if present {
            Ok(())
        } else {
            Err(self.error(format!("reference to unknown id {id}")))
        }
    }
}

/// Serializable representation of a whole object.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub epsilon: f64,
    pub vertices: Vec<VertexSnapshot>,
    pub edges: Vec<EdgeSnapshot>,
    pub verges: Vec<VergeSnapshot>,
    pub loops: Vec<LoopSnapshot>,
    pub faces: Vec<FaceSnapshot>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VertexSnapshot {
    pub id: VertexId,
    pub point: [f64; 3],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeSnapshot {
    pub id: EdgeId,
    pub vertices: [VertexId; 2],
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VergeSnapshot {
    pub id: VergeId,
    pub edges: Vec<EdgeId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoopSnapshot {
    pub id: LoopId,
    pub verges: Vec<VergeId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FaceSnapshot {
    pub id: FaceId,
    pub group: i32,
    pub outer_loop: LoopId,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inner_loops: Vec<LoopId>,
    /// `[A, B, C, D]` of `Ax + By + Cz + D = 0`.
    pub plane: [f64; 4],
    pub normal: [f64; 3],
}

impl SbrepObject {
    /// Serializes the object to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Creates a serializable snapshot, IDs preserved.
    pub fn to_snapshot(&self) -> ObjectSnapshot {
        ObjectSnapshot {
            epsilon: self.epsilon,
            vertices: self
                .vertices
                .iter()
                .map(|(id, v)| VertexSnapshot {
                    id,
                    point: [v.point.x, v.point.y, v.point.z],
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|(id, e)| EdgeSnapshot {
                    id,
                    vertices: [e.v1, e.v2],
                })
                .collect(),
            verges: self
                .verges
                .iter()
                .map(|(id, v)| VergeSnapshot {
                    id,
                    edges: v.edges.clone(),
                })
                .collect(),
            loops: self
                .loops
                .iter()
                .map(|(id, l)| LoopSnapshot {
                    id,
                    verges: l.verges.clone(),
                })
                .collect(),
            faces: self
                .faces
                .iter()
                .map(|(id, f)| FaceSnapshot {
                    id,
                    group: f.group_id,
                    outer_loop: f.outer_loop,
                    inner_loops: f.inner_loops.clone(),
                    plane: [f.plane.a, f.plane.b, f.plane.c, f.plane.d],
                    normal: [f.plane.normal.x, f.plane.normal.y, f.plane.normal.z],
                })
                .collect(),
        }
    }

    /// Deserializes an object from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ObjectSnapshot =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    /// Reconstructs an object from a snapshot.
    pub fn from_snapshot(snap: ObjectSnapshot) -> Result<Self> {
        let mut obj = SbrepObject::with_epsilon(snap.epsilon);
        let missing = |key: TopologyKey| Error::NotFound(key);

        for v in snap.vertices {
            let point = Point3::from(v.point);
            obj.vertices.insert_with_id(
                v.id,
                VertexData {
                    point,
                    parents: FxHashSet::default(),
                },
            )?;
            obj.grid_insert(v.id, &point);
        }
        for e in snap.edges {
            let [v1, v2] = e.vertices;
            for v in [v1, v2] {
                if !obj.vertices.contains(v) {
                    return Err(missing(v.into()));
                }
            }
            obj.edges.insert_with_id(e.id, EdgeData { v1, v2, parent: None })?;
        }
        for v in snap.verges {
            if let Some(&e) = v.edges.iter().find(|&&e| !obj.edges.contains(e)) {
                return Err(missing(e.into()));
            }
            obj.verges.insert_with_id(
                v.id,
                VergeData {
                    edges: v.edges,
                    parents: FxHashSet::default(),
                },
            )?;
        }
        for l in snap.loops {
            if let Some(&v) = l.verges.iter().find(|&&v| !obj.verges.contains(v)) {
                return Err(missing(v.into()));
            }
            obj.loops.insert_with_id(
                l.id,
                LoopData {
                    verges: l.verges,
                    parents: FxHashSet::default(),
                },
            )?;
        }
        for f in snap.faces {
            if let Some(l) = std::iter::once(f.outer_loop)
                .chain(f.inner_loops.iter().copied())
                .find(|&l| !obj.loops.contains(l))
            {
                return Err(missing(l.into()));
            }
            let [a, b, c, d] = f.plane;
            obj.faces.insert_with_id(
                f.id,
                FaceData {
                    group_id: f.group,
                    plane: Plane {
                        a,
                        b,
                        c,
                        d,
                        normal: Vector3::from(f.normal),
                    },
                    outer_loop: f.outer_loop,
                    inner_loops: f.inner_loops,
                },
            )?;
        }

        obj.redefine_feedbacks();
        Ok(obj)
    }
}
