//! System trait and the context systems run with

use std::any::{Any, TypeId};

use super::{Component, EcsError, Entity, World};
use crate::events::{Message, MessageBus, SceneEvent};
use crate::render::ResourceManager;
use crate::scene::Renderable;

/// Id of a system within its scene, in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u32);

impl SystemId {
    pub(crate) const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Registration index
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Component types an entity must carry to be processed by a system.
///
/// An empty list matches every entity.
#[derive(Debug, Clone, Default)]
pub struct Requirements {
    types: Vec<(TypeId, &'static str)>,
}

impl Requirements {
    /// Start an empty requirement list
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require component `T`
    pub fn require<T: Component>(mut self) -> Self {
        let id = TypeId::of::<T>();
        if !self.types.iter().any(|(existing, _)| *existing == id) {
            self.types.push((id, std::any::type_name::<T>()));
        }
        self
    }

    /// Number of required types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when any entity qualifies
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Required type ids with their names
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &'static str)> + '_ {
        self.types.iter().copied()
    }
}

/// Everything a system can touch while it runs
pub struct SystemContext<'a> {
    /// Entities and components. Destroying through here is silent; use
    /// [`destroy_entity`](Self::destroy_entity) to announce it.
    pub world: &'a mut World,
    /// Posts go out next frame
    pub messages: &'a mut MessageBus,
    /// Meshes and materials
    pub resources: &'a ResourceManager,
    /// Frame counter of the owning scene
    pub frame: u64,
    entities: &'a [Entity],
}

impl<'a> SystemContext<'a> {
    /// Assemble a context around a snapshot of the system's entities
    pub fn new(
        world: &'a mut World,
        messages: &'a mut MessageBus,
        resources: &'a ResourceManager,
        entities: &'a [Entity],
        frame: u64,
    ) -> Self {
        Self {
            world,
            messages,
            resources,
            frame,
            entities,
        }
    }

    /// The system's entities as they stood when the system started.
    ///
    /// Entities destroyed since then are still listed; their component
    /// lookups return `None`.
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    /// Destroy an entity and announce it with a [`SceneEvent`]
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.world.destroy_entity(entity)?;
        if let Err(e) = self.messages.post_value(SceneEvent::destroyed(entity)) {
            log::trace!("destroy of {} not announced: {}", entity, e);
        }
        Ok(())
    }
}

/// A unit of behaviour run by the scene every frame.
///
/// The scene calls systems in registration order. Each system sees the
/// entities carrying every component named by [`requirements`](Self::requirements).
pub trait System: Any {
    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Components an entity needs to be handed to this system
    fn requirements(&self) -> Requirements;

    /// Per-frame update
    fn process(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        let _ = (ctx, dt);
    }

    /// Called once per message delivered this frame
    fn handle_message(&mut self, ctx: &mut SystemContext<'_>, message: &Message) {
        let _ = (ctx, message);
    }

    /// An entity started matching this system
    fn on_entity_added(&mut self, world: &mut World, entity: Entity) {
        let _ = (world, entity);
    }

    /// An entity stopped matching this system or was destroyed
    fn on_entity_removed(&mut self, entity: Entity) {
        let _ = entity;
    }

    /// Systems that draw return themselves here
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    /// Mutable form of [`as_renderable`](Self::as_renderable)
    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        None
    }

    /// For downcasting
    fn as_any(&self) -> &dyn Any;

    /// For downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
