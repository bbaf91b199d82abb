//! Keeps sprite quads and world bounds current

use std::any::Any;

use crate::ecs::components::{SpriteComponent, TransformComponent};
use crate::ecs::{Requirements, System, SystemContext};

/// Rebuilds dirty sprite quads and places their bounds in world space
#[derive(Debug, Default)]
pub struct SpriteSystem {
    rebuilt: u64,
}

impl SpriteSystem {
    /// Create the system
    pub fn new() -> Self {
        Self::default()
    }

    /// Quads rebuilt since creation
    pub fn rebuilt_count(&self) -> u64 {
        self.rebuilt
    }
}

impl System for SpriteSystem {
    fn name(&self) -> &str {
        "SpriteSystem"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new()
            .require::<TransformComponent>()
            .require::<SpriteComponent>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) {
        for &entity in ctx.entities() {
            let Some((transform, sprite)) = ctx
                .world
                .get_two_mut::<TransformComponent, SpriteComponent>(entity)
            else {
                continue;
            };
            if sprite.is_dirty() {
                sprite.rebuild();
                self.rebuilt += 1;
            }
            let bounds = sprite.local_bounds().transformed(&transform.to_matrix());
            sprite.set_world_bounds(bounds);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
