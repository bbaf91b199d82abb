//! Component trait, component type ids and masks

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;

use super::EcsError;

/// Marker trait for components
pub trait Component: 'static + Send + Sync {}

/// Largest number of distinct component types a world can register
pub const MAX_COMPONENTS: usize = 64;

/// Dense per-world id of a component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u8);

impl ComponentId {
    /// Position of this type's bit in a [`ComponentMask`]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Set of component types, one bit per [`ComponentId`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// Mask with no bits set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Set the bit for `id`
    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= 1 << id.0;
    }

    /// Clear the bit for `id`
    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !(1 << id.0);
    }

    /// Copy of this mask with `id` set
    #[must_use]
    pub fn with(mut self, id: ComponentId) -> Self {
        self.insert(id);
        self
    }

    /// Whether `id` is set
    pub fn contains(&self, id: ComponentId) -> bool {
        self.0 & (1 << id.0) != 0
    }

    /// Whether every bit of `other` is also set here
    pub fn contains_all(&self, other: &Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether the masks share a bit
    pub fn intersects(&self, other: &Self) -> bool {
        self.0 & other.0 != 0
    }

    /// True when no bits are set
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Number of set bits
    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    /// Ids of the set bits in ascending order
    pub fn ids(&self) -> impl Iterator<Item = ComponentId> {
        let bits = self.0;
        (0..MAX_COMPONENTS as u8).filter(move |i| bits & (1 << i) != 0).map(ComponentId)
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMask({:#b})", self.0)
    }
}

/// Assigns ids to component types on first use
#[derive(Debug, Default)]
pub struct ComponentTypes {
    ids: HashMap<TypeId, ComponentId>,
    names: Vec<&'static str>,
}

impl ComponentTypes {
    /// Id of `T` if it has been registered
    pub fn id_of<T: Component>(&self) -> Option<ComponentId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Id of a type-erased component, if registered
    pub fn id_of_raw(&self, type_id: TypeId) -> Option<ComponentId> {
        self.ids.get(&type_id).copied()
    }

    /// Id of `T`, registering it if needed
    pub fn register<T: Component>(&mut self) -> Result<ComponentId, EcsError> {
        self.register_raw(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Type-erased form of [`register`](Self::register)
    pub fn register_raw(&mut self, type_id: TypeId, type_name: &'static str) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.ids.get(&type_id) {
            return Ok(*id);
        }
        if self.names.len() >= MAX_COMPONENTS {
            return Err(EcsError::ComponentLimit {
                type_name,
                max: MAX_COMPONENTS,
            });
        }
        let id = ComponentId(self.names.len() as u8);
        self.ids.insert(type_id, id);
        self.names.push(type_name);
        log::debug!("registered component type {} as {:?}", type_name, id);
        Ok(id)
    }

    /// Type name behind an id
    pub fn name(&self, id: ComponentId) -> Option<&'static str> {
        self.names.get(id.index()).copied()
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing is registered yet
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
