// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Auto-indexed entity store.

use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::keys::EntityId;

/// Flat storage addressed by monotonically assigned positive IDs.
///
/// Slot `i` holds the entity with ID `i + 1`. Removal leaves a tombstone, so
/// an ID is never handed out twice and iteration is always in ascending ID
/// order.
#[derive(Debug, Clone)]
pub struct IndexedCollection<K, T> {
    slots: Vec<Option<T>>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K, T> Default for IndexedCollection<K, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }
}

impl<K: EntityId, T> IndexedCollection<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn slot(id: K) -> Option<usize> {
        (id.raw() as usize).checked_sub(1)
    }

    /// The ID the next [`insert`](Self::insert) will return.
    #[inline]
    pub fn next_id(&self) -> K {
        K::from_raw(self.slots.len() as u32 + 1)
    }

    /// Stores `value` under a fresh ID.
    pub fn insert(&mut self, value: T) -> K {
        let id = self.next_id();
        self.slots.push(Some(value));
        self.len += 1;
        id
    }

    /// Stores `value` under an explicit ID, growing the store with
    /// tombstones as needed. Used when reading serialized objects.
    pub fn insert_with_id(&mut self, id: K, value: T) -> Result<()> {
        let slot = Self::slot(id).ok_or_else(|| Error::IdOccupied(id.into()))?;
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].is_some() {
            return Err(Error::IdOccupied(id.into()));
        }
        self.slots[slot] = Some(value);
        self.len += 1;
        Ok(())
    }

    #[inline]
    pub fn get(&self, id: K) -> Option<&T> {
        Self::slot(id)
            .and_then(|s| self.slots.get(s))
            .and_then(Option::as_ref)
    }

    #[inline]
    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        Self::slot(id)
            .and_then(|s| self.slots.get_mut(s))
            .and_then(Option::as_mut)
    }

    /// Like [`get`](Self::get), but a missing ID is an error.
    #[inline]
    pub fn try_get(&self, id: K) -> Result<&T> {
        self.get(id).ok_or_else(|| Error::NotFound(id.into()))
    }

    #[inline]
    pub fn try_get_mut(&mut self, id: K) -> Result<&mut T> {
        self.get_mut(id).ok_or_else(|| Error::NotFound(id.into()))
    }

    #[inline]
    pub fn contains(&self, id: K) -> bool {
        self.get(id).is_some()
    }

    /// Removes an entity, leaving a tombstone behind.
    pub fn remove(&mut self, id: K) -> Option<T> {
        let slot = Self::slot(id)?;
        let value = self.slots.get_mut(slot)?.take();
        if value.is_some() {
            self.len -= 1;
        }
        value
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entities in ascending ID order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (K::from_raw(i as u32 + 1), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|v| (K::from_raw(i as u32 + 1), v)))
    }

    /// Live IDs in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().filter_map(Option::as_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{TopologyKey, VertexId};

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut c: IndexedCollection<VertexId, &str> = IndexedCollection::new();
        assert_eq!(c.next_id(), VertexId(1));
        assert_eq!(c.insert("a"), VertexId(1));
        assert_eq!(c.insert("b"), VertexId(2));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut c: IndexedCollection<VertexId, i32> = IndexedCollection::new();
        let a = c.insert(1);
        let b = c.insert(2);
        assert_eq!(c.remove(b), Some(2));
        assert_eq!(c.remove(b), None);
        assert!(!c.contains(b));
        assert_eq!(c.insert(3), VertexId(3));
        assert_eq!(c.ids().collect::<Vec<_>>(), vec![a, VertexId(3)]);
    }

    #[test]
    fn missing_id_is_a_lookup_error() {
        let c: IndexedCollection<VertexId, i32> = IndexedCollection::new();
        assert!(c.get(VertexId(0)).is_none());
        match c.try_get(VertexId(5)) {
            Err(Error::NotFound(TopologyKey::Vertex(VertexId(5)))) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn insert_with_id_leaves_gaps() {
        let mut c: IndexedCollection<VertexId, i32> = IndexedCollection::new();
        c.insert_with_id(VertexId(4), 40).unwrap();
        c.insert_with_id(VertexId(2), 20).unwrap();
        assert_eq!(c.len(), 2);
        assert_eq!(c.next_id(), VertexId(5));
        assert!(c.insert_with_id(VertexId(4), 0).is_err());
        assert!(c.insert_with_id(VertexId(0), 0).is_err());
        assert_eq!(c.values().copied().collect::<Vec<_>>(), vec![20, 40]);
    }
}
