//! Specialized collection types

pub use slotmap::{SlotMap, Key, new_key_type};

/// Handle-based map using slot map for stable references
pub type HandleMap<K, T> = SlotMap<K, T>;

/// Fixed-capacity ring buffer that never reallocates after construction.
///
/// Slots are created up front from `T::default()`; pushing into a full ring
/// either fails or overwrites the oldest slot, as the caller chooses.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    slots: Vec<T>,
    head: usize,
    len: usize,
}

impl<T: Default + Clone> RingBuffer<T> {
    /// Create a ring holding at most `capacity` items
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![T::default(); capacity],
            head: 0,
            len: 0,
        }
    }
}

impl<T> RingBuffer<T> {
    /// Maximum number of items
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when another push would fail or overwrite
    pub fn is_full(&self) -> bool {
        self.len == self.slots.len()
    }

    /// Claim the next slot; `None` when full or zero-sized
    pub fn push_slot(&mut self) -> Option<&mut T> {
        if self.is_full() {
            return None;
        }
        let index = (self.head + self.len) % self.slots.len();
        self.len += 1;
        Some(&mut self.slots[index])
    }

    /// Claim the next slot, discarding the oldest item when full.
    ///
    /// Returns the slot and whether an item was overwritten.
    pub fn push_slot_overwrite(&mut self) -> Option<(&mut T, bool)> {
        if self.slots.is_empty() {
            return None;
        }
        let overwrote = self.is_full();
        if overwrote {
            self.head = (self.head + 1) % self.slots.len();
            self.len -= 1;
        }
        let index = (self.head + self.len) % self.slots.len();
        self.len += 1;
        Some((&mut self.slots[index], overwrote))
    }

    /// Item at logical position `index` (0 = oldest)
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        Some(&self.slots[(self.head + index) % self.slots.len()])
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len).map(move |i| &self.slots[(self.head + i) % self.slots.len()])
    }

    /// Forget all items; slots keep their storage
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_rejects_when_full() {
        let mut ring = RingBuffer::<u32>::with_capacity(2);
        *ring.push_slot().unwrap() = 1;
        *ring.push_slot().unwrap() = 2;
        assert!(ring.push_slot().is_none());
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_ring_overwrite_drops_oldest() {
        let mut ring = RingBuffer::<u32>::with_capacity(3);
        for i in 0..5 {
            let (slot, _) = ring.push_slot_overwrite().unwrap();
            *slot = i;
        }
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ring.get(0), Some(&2));
    }

    #[test]
    fn test_zero_capacity_ring() {
        let mut ring = RingBuffer::<u8>::with_capacity(0);
        assert!(ring.push_slot().is_none());
        assert!(ring.push_slot_overwrite().is_none());
    }
}
