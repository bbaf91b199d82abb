//! Abstract spatial query interface for visibility culling
//!
//! Renderers keep one index of world-space bounds per scene and ask it which
//! entities a camera frustum can see. Implementations only differ in how fast
//! they answer; the set of entities returned for a frustum is the same.

use std::any::Any;
use std::collections::HashMap;

use super::{AABB, Frustum};
use crate::ecs::Entity;

/// Abstract interface for frustum culling structures
pub trait SpatialIndex: Send + Sync {
    /// Insert an entity or replace its bounds
    fn insert(&mut self, entity: Entity, bounds: AABB);

    /// Remove an entity from the structure
    fn remove(&mut self, entity: Entity) -> bool;

    /// Update an entity's bounds; inserts entities not yet present
    fn update(&mut self, entity: Entity, bounds: AABB) {
        self.insert(entity, bounds);
    }

    /// Exact bounds last stored for an entity
    fn bounds(&self, entity: Entity) -> Option<AABB>;

    /// Append every entity whose bounds intersect the frustum to `out`
    fn query_frustum(&self, frustum: &Frustum, out: &mut Vec<Entity>);

    /// Clear all entities from the structure
    fn clear(&mut self);

    /// Get the number of entities in the structure
    fn entity_count(&self) -> usize;

    /// Downcast to Any for type-specific access
    fn as_any(&self) -> &dyn Any;

    /// Downcast to Any for mutable type-specific access
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Flat list tested entry by entry
#[derive(Debug, Default)]
pub struct LinearIndex {
    entries: Vec<(Entity, AABB)>,
    positions: HashMap<Entity, usize>,
}

impl LinearIndex {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }
}

impl SpatialIndex for LinearIndex {
    fn insert(&mut self, entity: Entity, bounds: AABB) {
        if let Some(&position) = self.positions.get(&entity) {
            self.entries[position].1 = bounds;
        } else {
            self.positions.insert(entity, self.entries.len());
            self.entries.push((entity, bounds));
        }
    }

    fn remove(&mut self, entity: Entity) -> bool {
        let Some(position) = self.positions.remove(&entity) else {
            return false;
        };
        self.entries.swap_remove(position);
        if let Some((moved, _)) = self.entries.get(position) {
            self.positions.insert(*moved, position);
        }
        true
    }

    fn bounds(&self, entity: Entity) -> Option<AABB> {
        self.positions.get(&entity).map(|&position| self.entries[position].1)
    }

    fn query_frustum(&self, frustum: &Frustum, out: &mut Vec<Entity>) {
        out.extend(
            self.entries
                .iter()
                .filter(|(_, bounds)| frustum.intersects_aabb(bounds))
                .map(|(entity, _)| *entity),
        );
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.positions.clear();
    }

    fn entity_count(&self) -> usize {
        self.entries.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
