//! Entity handles and slot allocation

use std::collections::VecDeque;
use std::fmt;

use bytemuck::{Pod, Zeroable};

/// Entity identifier
///
/// `index` addresses a registry slot, `generation` tells apart the successive
/// entities that have lived in that slot. A handle whose generation no longer
/// matches its slot is stale and every registry operation rejects it.
///
/// Ordering is by index then generation, which is what draw-list sorting uses
/// to break ties.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    /// Handle that never refers to a living entity. Returned once every slot
    /// is taken.
    pub const INVALID: Entity = Entity::new(u32::MAX, u32::MAX);

    /// Create an entity handle from its parts
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the registry
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when this handle was issued
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Hands out entity slots and tracks which are alive.
///
/// Destroyed slots go to the back of a FIFO queue and are only reused once
/// more than `min_free_indices` of them are waiting, so a slot stays retired
/// for a while before a new generation occupies it.
///
/// A slot whose generation reaches `u32::MAX` is retired for good instead of
/// wrapping. Index `u32::MAX` is never handed out; it belongs to
/// [`Entity::INVALID`].
#[derive(Debug)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_indices: VecDeque<u32>,
    min_free_indices: usize,
    live_count: usize,
    retired: usize,
    slot_limit: u32,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

impl EntityAllocator {
    /// Create an allocator with the given reuse threshold
    pub fn new(min_free_indices: usize) -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_indices: VecDeque::new(),
            min_free_indices,
            live_count: 0,
            retired: 0,
            slot_limit: u32::MAX,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_slot_limit(mut self, slot_limit: u32) -> Self {
        self.slot_limit = slot_limit;
        self
    }

    /// Allocate a handle for a new entity.
    ///
    /// Once every slot is in use and none is waiting for reuse this returns
    /// [`Entity::INVALID`], which every registry operation rejects as stale.
    pub fn allocate(&mut self) -> Entity {
        let fresh = u32::try_from(self.generations.len())
            .ok()
            .filter(|&index| index < self.slot_limit);

        if self.free_indices.len() > self.min_free_indices || fresh.is_none() {
            if let Some(index) = self.free_indices.pop_front() {
                let slot = index as usize;
                self.alive[slot] = true;
                self.live_count += 1;
                return Entity::new(index, self.generations[slot]);
            }
        }

        let Some(index) = fresh else {
            log::error!("entity slots exhausted: {} alive, {} retired", self.live_count, self.retired);
            return Entity::INVALID;
        };
        self.generations.push(0);
        self.alive.push(true);
        self.live_count += 1;
        Entity::new(index, 0)
    }

    /// Retire a live entity; returns false for stale handles
    pub fn free(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.live_count -= 1;
        match self.generations[slot].checked_add(1) {
            Some(next) => {
                self.generations[slot] = next;
                self.free_indices.push_back(entity.index);
            }
            None => {
                log::debug!("slot {} used up its generations, retiring it", entity.index);
                self.retired += 1;
            }
        }
        true
    }

    /// Slots taken out of circulation after exhausting their generations
    pub fn retired_count(&self) -> usize {
        self.retired
    }

    /// Whether the handle refers to a currently living entity
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.index as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == entity.generation
    }

    /// Number of living entities
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Number of slots ever created
    pub fn slot_count(&self) -> usize {
        self.generations.len()
    }

    /// Iterate living entities in slot order
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.generations
            .iter()
            .zip(&self.alive)
            .enumerate()
            .filter(|(_, (_, alive))| **alive)
            .map(|(index, (generation, _))| Entity::new(index as u32, *generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_allocate_fresh_slots() {
        let mut allocator = EntityAllocator::new(0);
        let a = allocator.allocate();
        let b = allocator.allocate();
        assert_ne!(a, b);
        assert_eq!(allocator.live_count(), 2);
    }

    #[test]
    fn test_reuse_bumps_generation() {
        let mut allocator = EntityAllocator::new(0);
        let a = allocator.allocate();
        assert!(allocator.free(a));
        let b = allocator.allocate();
        assert_eq!(a.index(), b.index());
        assert_eq!(b.generation(), a.generation() + 1);
        assert!(!allocator.is_alive(a));
        assert!(allocator.is_alive(b));
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut allocator = EntityAllocator::new(0);
        let a = allocator.allocate();
        assert!(allocator.free(a));
        assert!(!allocator.free(a));
        assert_eq!(allocator.live_count(), 0);
    }

    #[test]
    fn test_reuse_waits_for_threshold() {
        let mut allocator = EntityAllocator::new(2);
        let first: Vec<_> = (0..3).map(|_| allocator.allocate()).collect();
        allocator.free(first[0]);
        allocator.free(first[1]);
        // two waiting, threshold two: still a fresh slot
        assert_eq!(allocator.allocate().index(), 3);
        allocator.free(first[2]);
        // three waiting: oldest freed slot comes back first
        assert_eq!(allocator.allocate().index(), first[0].index());
    }

    #[test]
    fn test_last_generation_retires_slot() {
        let mut allocator = EntityAllocator::new(0);
        let first = allocator.allocate();
        allocator.generations[first.index() as usize] = u32::MAX - 1;
        let worn = Entity::new(first.index(), u32::MAX - 1);

        assert!(allocator.free(worn));
        let last = allocator.allocate();
        assert_eq!(last, Entity::new(first.index(), u32::MAX));

        assert!(allocator.free(last));
        assert_eq!(allocator.retired_count(), 1);
        let next = allocator.allocate();
        assert_ne!(next.index(), first.index());
        assert_eq!(next.generation(), 0);
        assert!(!allocator.is_alive(last));
        assert!(!allocator.is_alive(Entity::new(first.index(), 0)));
    }

    #[test]
    fn test_exhausted_slots_yield_invalid() {
        let mut allocator = EntityAllocator::new(4).with_slot_limit(2);
        let a = allocator.allocate();
        let b = allocator.allocate();
        let none = allocator.allocate();
        assert_eq!(none, Entity::INVALID);
        assert!(!allocator.is_alive(none));
        assert!(!allocator.free(none));
        assert_eq!(allocator.live_count(), 2);

        // out of fresh slots, so a freed one comes back below the threshold
        assert!(allocator.free(a));
        let reused = allocator.allocate();
        assert_eq!(reused.index(), a.index());
        assert_ne!(reused, a);
        assert_ne!(reused, b);
    }

    #[test]
    fn test_no_aliasing_across_churn() {
        let mut allocator = EntityAllocator::new(0);
        let mut retired = HashSet::new();
        let mut live = Vec::new();
        for round in 0..200 {
            live.push(allocator.allocate());
            if round % 3 == 0 {
                let victim = live.remove(0);
                allocator.free(victim);
                retired.insert(victim);
            }
            for entity in &live {
                assert!(!retired.contains(entity));
            }
        }
        assert_eq!(allocator.iter().count(), live.len());
    }
}
