//! Systems that draw

use std::ops::AddAssign;

use crate::ecs::{Entity, World};
use crate::render::{BackendResult, RenderBackend, ResourceManager};

/// Outcome of building one camera's draw lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CullStats {
    /// Entities in the spatial index
    pub indexed: usize,
    /// Entities whose bounds intersect the frustum
    pub candidates: usize,
    /// Entities that made it into a draw list
    pub visible: usize,
    /// Entities outside the frustum
    pub culled: usize,
    /// Hidden or filtered out by render flags
    pub filtered: usize,
    /// Skipped because a mesh or material is missing or not ready
    pub unready: usize,
}

impl AddAssign for CullStats {
    fn add_assign(&mut self, other: Self) {
        self.indexed += other.indexed;
        self.candidates += other.candidates;
        self.visible += other.visible;
        self.culled += other.culled;
        self.filtered += other.filtered;
        self.unready += other.unready;
    }
}

/// Backend calls issued for one camera
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Submesh draws
    pub draw_calls: usize,
    /// Material changes
    pub material_binds: usize,
    /// Entries dropped because their data vanished since the lists were built
    pub skipped: usize,
}

impl AddAssign for RenderStats {
    fn add_assign(&mut self, other: Self) {
        self.draw_calls += other.draw_calls;
        self.material_binds += other.material_binds;
        self.skipped += other.skipped;
    }
}

/// A system the scene asks to build and draw lists for each camera
pub trait Renderable {
    /// Refresh per-entity state from the world as every system left it.
    ///
    /// Called once per frame before any camera's lists are rebuilt, with the
    /// system's current members.
    fn prepare(&mut self, world: &World, resources: &ResourceManager, entities: &[Entity]);

    /// Rebuild the lists drawn for `camera`
    fn update_draw_list(&mut self, world: &World, resources: &ResourceManager, camera: Entity) -> CullStats;

    /// Issue the lists last built for `camera`. A camera that lost its
    /// camera or transform since then draws nothing.
    fn render(
        &self,
        world: &World,
        resources: &ResourceManager,
        camera: Entity,
        backend: &mut dyn RenderBackend,
    ) -> BackendResult<RenderStats>;
}
