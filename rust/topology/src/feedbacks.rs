// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Rebuilding and checking upward references.

use crate::arena::SbrepObject;

impl SbrepObject {
    /// Recomputes every parent reference from the child lists.
    ///
    /// Vertex → edges from edge endpoints, edge → verge from verge edge
    /// lists, verge → loops from loop verge lists, loop → faces from face
    /// loops. Running it twice gives the same state as running it once.
    pub fn redefine_feedbacks(&mut self) {
        for (_, v) in self.vertices.iter_mut() {
            v.parents.clear();
        }
        for (_, e) in self.edges.iter_mut() {
            e.parent = None;
        }
        for (_, v) in self.verges.iter_mut() {
            v.parents.clear();
        }
        for (_, l) in self.loops.iter_mut() {
            l.parents.clear();
        }

        let edge_links: Vec<_> = self.edges.iter().map(|(id, e)| (id, e.v1, e.v2)).collect();
        for (id, v1, v2) in edge_links {
            for v in [v1, v2] {
                if let Some(vertex) = self.vertices.get_mut(v) {
                    vertex.parents.insert(id);
                }
            }
        }

        let verge_links: Vec<_> = self
            .verges
            .iter()
            .flat_map(|(id, v)| v.edges.iter().map(move |&e| (e, id)))
            .collect();
        for (e, verge) in verge_links {
            if let Some(edge) = self.edges.get_mut(e) {
                edge.parent = Some(verge);
            }
        }

        let loop_links: Vec<_> = self
            .loops
            .iter()
            .flat_map(|(id, l)| l.verges.iter().map(move |&v| (v, id)))
            .collect();
        for (v, l) in loop_links {
            if let Some(verge) = self.verges.get_mut(v) {
                verge.parents.insert(l);
            }
        }

        let face_links: Vec<_> = self
            .faces
            .iter()
            .flat_map(|(id, f)| f.loops().map(move |l| (l, id)).collect::<Vec<_>>())
            .collect();
        for (l, f) in face_links {
            if let Some(lp) = self.loops.get_mut(l) {
                lp.parents.insert(f);
            }
        }

        tracing::trace!(
            vertices = self.vertices.len(),
            edges = self.edges.len(),
            verges = self.verges.len(),
            loops = self.loops.len(),
            faces = self.faces.len(),
            "redefined feedbacks"
        );
    }

    /// `true` if the maintained parent sets equal what
    /// [`redefine_feedbacks`](Self::redefine_feedbacks) would compute.
    pub fn feedbacks_consistent(&self) -> bool {
        let mut rebuilt = self.clone();
        rebuilt.redefine_feedbacks();

        self.vertices
            .iter()
            .zip(rebuilt.vertices.iter())
            .all(|((_, a), (_, b))| a.parents == b.parents)
            && self
                .edges
                .iter()
                .zip(rebuilt.edges.iter())
                .all(|((_, a), (_, b))| a.parent == b.parent)
            && self
                .verges
                .iter()
                .zip(rebuilt.verges.iter())
                .all(|((_, a), (_, b))| a.parents == b.parents)
            && self
                .loops
                .iter()
                .zip(rebuilt.loops.iter())
                .all(|((_, a), (_, b))| a.parents == b.parents)
    }
}
