//! Entity-Component-System implementation
//!
//! Entities are generational handles, components live in one sparse pool per
//! type, and systems see the entities whose component mask covers their
//! requirements.

pub mod component;
pub mod components;
pub mod entity;
pub mod error;
pub mod storage;
pub mod system;
pub mod systems;
pub mod world;

pub use component::{Component, ComponentId, ComponentMask, ComponentTypes, MAX_COMPONENTS};
pub use entity::{Entity, EntityAllocator};
pub use error::EcsError;
pub use storage::ComponentPool;
pub use system::{Requirements, System, SystemContext, SystemId};
pub use world::{MembershipChange, MembershipEvent, World};
