//! Runs per-entity closures

use std::any::Any;

use crate::ecs::components::CallbackComponent;
use crate::ecs::{Requirements, System, SystemContext};

/// Calls every active [`CallbackComponent`] once per frame
#[derive(Debug, Default)]
pub struct CallbackSystem;

impl CallbackSystem {
    /// Create the system
    pub fn new() -> Self {
        Self
    }
}

impl System for CallbackSystem {
    fn name(&self) -> &str {
        "CallbackSystem"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().require::<CallbackComponent>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        for &entity in ctx.entities() {
            let Some(callback) = ctx.world.get_component_mut::<CallbackComponent>(entity) else {
                continue;
            };
            if !callback.active {
                continue;
            }
            let Some(mut function) = callback.take() else {
                continue;
            };

            function(entity, &mut *ctx.world, dt);

            // the closure may have removed its own component or entity
            match ctx.world.get_component_mut::<CallbackComponent>(entity) {
                Some(callback) => callback.restore(function),
                None => log::trace!("callback of {} dropped with its component", entity),
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::TransformComponent;
    use crate::ecs::World;
    use crate::events::{MessageBus, OverflowPolicy};
    use crate::foundation::math::Vec3;
    use crate::render::ResourceManager;

    fn run(world: &mut World, entities: &[crate::ecs::Entity], dt: f32) {
        let mut bus = MessageBus::with_capacity(4, OverflowPolicy::RejectNew);
        let resources = ResourceManager::new();
        let mut ctx = SystemContext::new(world, &mut bus, &resources, entities, 0);
        CallbackSystem::new().process(&mut ctx, dt);
    }

    #[test]
    fn test_closure_moves_entity() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::identity()).unwrap();
        world
            .add_component(
                entity,
                CallbackComponent::new(|entity, world, dt| {
                    if let Some(transform) = world.get_component_mut::<TransformComponent>(entity) {
                        transform.translate(Vec3::new(dt, 0.0, 0.0));
                    }
                }),
            )
            .unwrap();

        run(&mut world, &[entity], 0.5);
        run(&mut world, &[entity], 0.5);
        let transform = world.get_component::<TransformComponent>(entity).unwrap();
        assert_eq!(transform.position.x, 1.0);
        assert!(world.get_component::<CallbackComponent>(entity).unwrap().has_function());
    }

    #[test]
    fn test_inactive_skipped() {
        let mut world = World::new();
        let entity = world.create_entity();
        let mut callback = CallbackComponent::new(|entity, world, _| {
            let _ = world.destroy_entity(entity);
        });
        callback.active = false;
        world.add_component(entity, callback).unwrap();

        run(&mut world, &[entity], 0.1);
        assert!(world.is_alive(entity));
    }

    #[test]
    fn test_self_destroying_closure() {
        let mut world = World::new();
        let entity = world.create_entity();
        world
            .add_component(
                entity,
                CallbackComponent::new(|entity, world, _| {
                    let _ = world.destroy_entity(entity);
                }),
            )
            .unwrap();

        run(&mut world, &[entity], 0.1);
        assert!(!world.is_alive(entity));
    }
}
