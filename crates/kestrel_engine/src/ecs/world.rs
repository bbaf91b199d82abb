//! ECS World implementation
//!
//! The world owns entity slots, one [`ComponentPool`] per component type and
//! the entity lists of every registered system. System lists are kept in step
//! with component changes immediately; the matching added/removed callbacks
//! are queued as [`MembershipEvent`]s for the scene to deliver.

use super::component::{ComponentMask, ComponentTypes};
use super::entity::EntityAllocator;
use super::storage::{AnyPool, ComponentPool};
use super::system::{Requirements, SystemId};
use super::{Component, EcsError, Entity};

const NOT_MEMBER: u32 = u32::MAX;

/// Whether an entity joined or left a system's list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipChange {
    /// The entity now satisfies the system's requirements
    Added,
    /// The entity no longer does, or was destroyed
    Removed,
}

/// Queued notification for a system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MembershipEvent {
    /// System whose list changed
    pub system: SystemId,
    /// Entity that joined or left
    pub entity: Entity,
    /// Direction of the change
    pub change: MembershipChange,
}

/// Entity list of one system
#[derive(Debug)]
struct SystemMembers {
    required: ComponentMask,
    entities: Vec<Entity>,
    // entity slot -> position in `entities`
    positions: Vec<u32>,
}

impl SystemMembers {
    fn new(required: ComponentMask) -> Self {
        Self {
            required,
            entities: Vec::new(),
            positions: Vec::new(),
        }
    }

    fn insert(&mut self, entity: Entity) {
        let slot = entity.index() as usize;
        if slot >= self.positions.len() {
            self.positions.resize(slot + 1, NOT_MEMBER);
        }
        self.positions[slot] = self.entities.len() as u32;
        self.entities.push(entity);
    }

    fn remove(&mut self, entity: Entity) -> bool {
        let slot = entity.index() as usize;
        let Some(&position) = self.positions.get(slot) else {
            return false;
        };
        if position == NOT_MEMBER || self.entities[position as usize] != entity {
            return false;
        }
        self.positions[slot] = NOT_MEMBER;
        self.entities.swap_remove(position as usize);
        if let Some(moved) = self.entities.get(position as usize) {
            self.positions[moved.index() as usize] = position;
        }
        true
    }
}

/// ECS World containing all entities and components
pub struct World {
    allocator: EntityAllocator,
    types: ComponentTypes,
    pools: Vec<Option<Box<dyn AnyPool>>>,
    masks: Vec<ComponentMask>,
    systems: Vec<SystemMembers>,
    pending: Vec<MembershipEvent>,
}

impl World {
    /// Create a new world with the default slot reuse threshold
    pub fn new() -> Self {
        Self::with_min_free_indices(crate::core::SceneConfig::default().min_free_indices)
    }

    /// Create a world that reuses destroyed slots only once more than
    /// `min_free_indices` are waiting
    pub fn with_min_free_indices(min_free_indices: usize) -> Self {
        Self {
            allocator: EntityAllocator::new(min_free_indices),
            types: ComponentTypes::default(),
            pools: Vec::new(),
            masks: Vec::new(),
            systems: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Create a new entity with no components
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.allocator.allocate();
        if entity == Entity::INVALID {
            return entity;
        }
        let slot = entity.index() as usize;
        if slot >= self.masks.len() {
            self.masks.resize(slot + 1, ComponentMask::empty());
        }
        self.masks[slot] = ComponentMask::empty();

        // systems with no requirements see every entity
        for (id, members) in self.systems.iter_mut().enumerate() {
            if members.required.is_empty() {
                members.insert(entity);
                self.pending.push(MembershipEvent {
                    system: SystemId::new(id as u32),
                    entity,
                    change: MembershipChange::Added,
                });
            }
        }
        log::trace!("created entity {}", entity);
        entity
    }

    /// Destroy an entity and drop all of its components.
    ///
    /// Posts no [`SceneEvent`](crate::events::SceneEvent). Systems that want
    /// the destruction announced call `SystemContext::destroy_entity`, and
    /// outside a frame `Scene::destroy_entity` does the same.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.allocator.is_alive(entity) {
            log::debug!("ignoring destroy of stale entity {}", entity);
            return Err(EcsError::StaleEntity(entity));
        }

        let slot = entity.index() as usize;
        let mask = std::mem::take(&mut self.masks[slot]);

        for (id, members) in self.systems.iter_mut().enumerate() {
            if mask.contains_all(&members.required) && members.remove(entity) {
                self.pending.push(MembershipEvent {
                    system: SystemId::new(id as u32),
                    entity,
                    change: MembershipChange::Removed,
                });
            }
        }

        for id in mask.ids() {
            if let Some(pool) = self.pools[id.index()].as_mut() {
                pool.remove_entity(entity);
            }
        }

        self.allocator.free(entity);
        log::trace!("destroyed entity {}", entity);
        Ok(())
    }

    /// Whether the handle refers to a living entity
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    /// Number of living entities
    pub fn entity_count(&self) -> usize {
        self.allocator.live_count()
    }

    /// Iterate all living entities
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.allocator.iter()
    }

    /// Attach a component, replacing any previous one of the same type
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        let id = self.types.register::<T>()?;
        if id.index() >= self.pools.len() {
            self.pools.resize_with(id.index() + 1, || None);
        }
        if let Some(pool) = self.pools[id.index()]
            .get_or_insert_with(|| Box::new(ComponentPool::<T>::new()))
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
        {
            pool.insert(entity, component);
        }

        let slot = entity.index() as usize;
        let old = self.masks[slot];
        self.masks[slot].insert(id);
        let new = self.masks[slot];
        self.refresh_membership(entity, old, new);
        Ok(())
    }

    /// Detach and return a component
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        let Some(id) = self.types.id_of::<T>() else {
            return Ok(None);
        };
        let removed = self.components_mut::<T>().and_then(|pool| pool.remove(entity));
        if removed.is_some() {
            let slot = entity.index() as usize;
            let old = self.masks[slot];
            self.masks[slot].remove(id);
            let new = self.masks[slot];
            self.refresh_membership(entity, old, new);
        }
        Ok(removed)
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.components::<T>()?.get(entity)
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.components_mut::<T>()?.get_mut(entity)
    }

    /// Whether the entity has a component of type `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.components::<T>().is_some_and(|pool| pool.contains(entity))
    }

    /// Borrow two different components of one entity mutably
    pub fn get_two_mut<A: Component, B: Component>(&mut self, entity: Entity) -> Option<(&mut A, &mut B)> {
        let a = self.types.id_of::<A>()?.index();
        let b = self.types.id_of::<B>()?.index();
        if a == b || !self.allocator.is_alive(entity) {
            return None;
        }

        let (pool_a, pool_b) = if a < b {
            let (low, high) = self.pools.split_at_mut(b);
            (low[a].as_mut()?, high[0].as_mut()?)
        } else {
            let (low, high) = self.pools.split_at_mut(a);
            (high[0].as_mut()?, low[b].as_mut()?)
        };

        let first = pool_a.as_any_mut().downcast_mut::<ComponentPool<A>>()?.get_mut(entity)?;
        let second = pool_b.as_any_mut().downcast_mut::<ComponentPool<B>>()?.get_mut(entity)?;
        Some((first, second))
    }

    /// Storage for `T`, if any entity ever had one
    pub fn components<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let id = self.types.id_of::<T>()?;
        self.pools.get(id.index())?.as_ref()?.as_any().downcast_ref()
    }

    /// Mutable storage for `T`
    pub fn components_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        let id = self.types.id_of::<T>()?;
        self.pools.get_mut(id.index())?.as_mut()?.as_any_mut().downcast_mut()
    }

    /// Iterate every `(entity, &T)`
    pub fn query<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.components::<T>().into_iter().flat_map(|pool| pool.iter())
    }

    /// Iterate every `(entity, &mut T)`
    pub fn query_mut<T: Component>(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.components_mut::<T>().into_iter().flat_map(|pool| pool.iter_mut())
    }

    /// Component types attached to an entity
    pub fn component_mask(&self, entity: Entity) -> Option<ComponentMask> {
        self.allocator
            .is_alive(entity)
            .then(|| self.masks[entity.index() as usize])
    }

    /// Registry of component type ids
    pub fn component_types(&self) -> &ComponentTypes {
        &self.types
    }

    /// Turn a requirement list into a mask, registering unseen types
    pub fn resolve(&mut self, requirements: &Requirements) -> Result<ComponentMask, EcsError> {
        let mut mask = ComponentMask::empty();
        for (type_id, name) in requirements.iter() {
            mask.insert(self.types.register_raw(type_id, name)?);
        }
        Ok(mask)
    }

    /// Start tracking the entities that carry every component in `required`.
    ///
    /// Entities that already qualify are listed straight away and get an
    /// `Added` event like any later arrival.
    pub fn register_system_filter(&mut self, required: ComponentMask) -> SystemId {
        let id = SystemId::new(self.systems.len() as u32);
        let mut members = SystemMembers::new(required);
        for entity in self.allocator.iter() {
            if self.masks[entity.index() as usize].contains_all(&required) {
                members.insert(entity);
                self.pending.push(MembershipEvent {
                    system: id,
                    entity,
                    change: MembershipChange::Added,
                });
            }
        }
        self.systems.push(members);
        id
    }

    /// Entities currently matching a system
    pub fn members(&self, system: SystemId) -> &[Entity] {
        self.systems
            .get(system.index())
            .map_or(&[], |members| members.entities.as_slice())
    }

    /// Whether any membership callbacks are waiting
    pub fn has_membership_events(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Hand the queued membership events over to `out`, which is cleared first
    pub fn take_membership_events(&mut self, out: &mut Vec<MembershipEvent>) {
        out.clear();
        std::mem::swap(out, &mut self.pending);
    }

    fn refresh_membership(&mut self, entity: Entity, old: ComponentMask, new: ComponentMask) {
        for (id, members) in self.systems.iter_mut().enumerate() {
            let was = old.contains_all(&members.required);
            let now = new.contains_all(&members.required);
            let change = match (was, now) {
                (false, true) => {
                    members.insert(entity);
                    MembershipChange::Added
                }
                (true, false) => {
                    members.remove(entity);
                    MembershipChange::Removed
                }
                _ => continue,
            };
            self.pending.push(MembershipEvent {
                system: SystemId::new(id as u32),
                entity,
                change,
            });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
