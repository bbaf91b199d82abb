//! Sparse-set component storage
//!
//! Each component type lives in its own pool. Components are packed densely
//! for iteration; a sparse array indexed by entity slot points into the dense
//! arrays. Removal swaps the last element into the hole.

use std::any::Any;

use super::{Component, Entity};

const EMPTY: u32 = u32::MAX;

/// Type-erased view of a pool, used by the world for bulk operations
pub trait AnyPool: Any + Send + Sync {
    /// Drop the component owned by `entity`, if any
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Number of stored components
    fn len(&self) -> usize;

    /// True when the pool holds nothing
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// For downcasting
    fn as_any(&self) -> &dyn Any;

    /// For downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage for one component type
pub struct ComponentPool<T: Component> {
    dense: Vec<T>,
    owners: Vec<Entity>,
    sparse: Vec<u32>,
}

impl<T: Component> ComponentPool<T> {
    /// Create an empty pool
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            owners: Vec::new(),
            sparse: Vec::new(),
        }
    }

    fn dense_index(&self, entity: Entity) -> Option<usize> {
        let slot = *self.sparse.get(entity.index() as usize)?;
        if slot == EMPTY {
            return None;
        }
        let slot = slot as usize;
        // a previous generation in the same slot does not count
        (self.owners[slot] == entity).then_some(slot)
    }

    /// Store `component` for `entity`, returning the value it replaced
    pub fn insert(&mut self, entity: Entity, component: T) -> Option<T> {
        if let Some(slot) = self.dense_index(entity) {
            return Some(std::mem::replace(&mut self.dense[slot], component));
        }

        let index = entity.index() as usize;
        if index >= self.sparse.len() {
            self.sparse.resize(index + 1, EMPTY);
        }
        // a leftover entry from an older generation is simply overwritten
        if self.sparse[index] != EMPTY {
            let stale = self.sparse[index] as usize;
            self.swap_remove_at(stale);
        }
        self.sparse[index] = self.dense.len() as u32;
        self.dense.push(component);
        self.owners.push(entity);
        None
    }

    /// Remove and return the component of `entity`
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.dense_index(entity)?;
        Some(self.swap_remove_at(slot))
    }

    fn swap_remove_at(&mut self, slot: usize) -> T {
        let owner = self.owners[slot];
        self.sparse[owner.index() as usize] = EMPTY;
        let last = self.dense.len() - 1;
        if slot != last {
            let moved = self.owners[last];
            self.sparse[moved.index() as usize] = slot as u32;
        }
        self.owners.swap_remove(slot);
        self.dense.swap_remove(slot)
    }

    /// Component of `entity`
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.dense_index(entity).map(|slot| &self.dense[slot])
    }

    /// Mutable component of `entity`
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.dense_index(entity).map(move |slot| &mut self.dense[slot])
    }

    /// Whether `entity` has a component here
    pub fn contains(&self, entity: Entity) -> bool {
        self.dense_index(entity).is_some()
    }

    /// Iterate `(entity, component)` pairs in storage order
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    /// Mutable form of [`iter`](Self::iter)
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    /// Entities owning a component, in storage order
    pub fn entities(&self) -> &[Entity] {
        &self.owners
    }
}

impl<T: Component> Default for ComponentPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn len(&self) -> usize {
        self.dense.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
