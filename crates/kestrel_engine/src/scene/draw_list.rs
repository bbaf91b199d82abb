//! Sorted draw lists
//!
//! A draw list holds one entry per visible entity and pass. Entries keep
//! their submesh vectors between frames; clearing a list only resets its
//! length.

use crate::ecs::Entity;
use crate::render::MaterialId;

/// Sort key and the submeshes an entity draws in one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortData {
    /// Opaque: material then depth; transparent: blend priority then depth
    pub key: i64,
    /// Submesh index with the material it is drawn with
    pub submeshes: Vec<(u32, MaterialId)>,
}

/// One draw list entry
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialPair {
    /// Entity whose model is drawn
    pub entity: Entity,
    /// Ordering and submeshes
    pub sort: SortData,
}

/// Reusable list of [`MaterialPair`]s
#[derive(Debug, Default)]
pub struct DrawList {
    entries: Vec<MaterialPair>,
    len: usize,
}

impl DrawList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget all entries, keeping their storage
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the list has no entries
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries in their current order
    pub fn entries(&self) -> &[MaterialPair] {
        &self.entries[..self.len]
    }

    /// Iterate entries in their current order
    pub fn iter(&self) -> impl Iterator<Item = &MaterialPair> + '_ {
        self.entries().iter()
    }

    /// Append an entry with no submeshes, reusing a previous slot when possible
    pub fn push(&mut self, entity: Entity, key: i64) -> &mut SortData {
        if self.len == self.entries.len() {
            self.entries.push(MaterialPair {
                entity,
                sort: SortData::default(),
            });
        }
        let entry = &mut self.entries[self.len];
        self.len += 1;
        entry.entity = entity;
        entry.sort.key = key;
        entry.sort.submeshes.clear();
        &mut entry.sort
    }

    /// Most recent entry
    pub fn last_mut(&mut self) -> Option<&mut SortData> {
        self.entries[..self.len].last_mut().map(|entry| &mut entry.sort)
    }

    /// Order by key ascending, ties by entity
    pub fn sort_ascending(&mut self) {
        self.entries[..self.len].sort_unstable_by(|a, b| {
            a.sort.key.cmp(&b.sort.key).then(a.entity.cmp(&b.entity))
        });
    }

    /// Order by key descending, ties by entity ascending
    pub fn sort_descending(&mut self) {
        self.entries[..self.len].sort_unstable_by(|a, b| {
            b.sort.key.cmp(&a.sort.key).then(a.entity.cmp(&b.entity))
        });
    }
}
