//! Scene - owns the world and drives systems frame by frame
//!
//! A frame is `simulate` followed by `render`:
//!
//! 1. The message bus flips; every message posted last frame goes to every
//!    system in registration order, messages in post order.
//! 2. Systems run `process` in registration order. Queued membership
//!    callbacks are dispatched before each system runs and after the last.
//! 3. Every renderable system prepares against the world the systems left
//!    behind, then rebuilds its draw lists for every active camera.
//!
//! `render` then asks each renderable system to draw those lists.

use super::renderable::{CullStats, RenderStats};
use crate::core::SceneConfig;
use crate::ecs::components::{CameraComponent, TransformComponent};
use crate::ecs::{
    Component, EcsError, Entity, MembershipChange, MembershipEvent, System, SystemContext, SystemId, World,
};
use crate::events::{MessageBus, SceneEvent};
use crate::foundation::time::Stopwatch;
use crate::render::{BackendResult, RenderBackend, ResourceManager};

// Rounds of membership callbacks per dispatch before giving up
const MAX_MEMBERSHIP_ROUNDS: usize = 64;

/// Per-frame scene statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneStats {
    /// Frames simulated
    pub frame: u64,
    /// Living entities
    pub entity_count: usize,
    /// Registered systems
    pub system_count: usize,
    /// Messages delivered this frame
    pub messages_delivered: usize,
    /// Posts lost to a full bus since the scene started
    pub messages_dropped: u64,
    /// Cameras draw lists were built for
    pub camera_count: usize,
    /// Culling totals over all renderables and cameras
    pub cull: CullStats,
    /// Backend calls issued by the last render
    pub render: RenderStats,
    /// Time spent in the last `simulate`
    pub simulate_micros: u64,
    /// Time spent in the last `render`
    pub render_micros: u64,
}

struct SystemEntry {
    id: SystemId,
    system: Box<dyn System>,
    snapshot: Vec<Entity>,
}

impl SystemEntry {
    fn refresh(&mut self, world: &World) {
        self.snapshot.clear();
        self.snapshot.extend_from_slice(world.members(self.id));
    }
}

/// Owns one world, its systems and its message bus
pub struct Scene {
    config: SceneConfig,
    world: World,
    systems: Vec<SystemEntry>,
    renderables: Vec<usize>,
    messages: MessageBus,
    resources: ResourceManager,
    membership: Vec<MembershipEvent>,
    cameras: Vec<Entity>,
    frame: u64,
    stats: SceneStats,
}

impl Scene {
    /// Create an empty scene
    pub fn new(config: SceneConfig) -> Self {
        log::info!(
            "creating scene (bus capacity {}, {:?} culling)",
            config.message_bus.capacity,
            config.culling.strategy
        );
        Self {
            world: World::with_min_free_indices(config.min_free_indices),
            messages: MessageBus::new(&config.message_bus),
            config,
            systems: Vec::new(),
            renderables: Vec::new(),
            resources: ResourceManager::new(),
            membership: Vec::new(),
            cameras: Vec::new(),
            frame: 0,
            stats: SceneStats::default(),
        }
    }

    /// Settings the scene was created with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Entities and components
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable entities and components
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Meshes and materials
    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    /// Mutable meshes and materials
    pub fn resources_mut(&mut self) -> &mut ResourceManager {
        &mut self.resources
    }

    /// The scene's message bus
    pub fn messages(&self) -> &MessageBus {
        &self.messages
    }

    /// Post from outside any system; delivered next frame
    pub fn messages_mut(&mut self) -> &mut MessageBus {
        &mut self.messages
    }

    /// Frames simulated so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Statistics of the last frame
    pub fn stats(&self) -> &SceneStats {
        &self.stats
    }

    /// Create an entity
    pub fn create_entity(&mut self) -> Entity {
        self.world.create_entity()
    }

    /// Destroy an entity and announce it to systems next frame
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.world.destroy_entity(entity)?;
        if let Err(e) = self.messages.post_value(SceneEvent::destroyed(entity)) {
            log::trace!("destroy of {} not announced: {}", entity, e);
        }
        Ok(())
    }

    /// Attach or replace a component
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        self.world.add_component(entity, component)
    }

    /// Detach a component
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<Option<T>, EcsError> {
        self.world.remove_component(entity)
    }

    /// Read a component
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.world.get_component(entity)
    }

    /// Modify a component
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.world.get_component_mut(entity)
    }

    /// Register a system after those already present.
    ///
    /// Entities that already match are handed to it through
    /// `on_entity_added` before it first runs.
    pub fn add_system(&mut self, system: Box<dyn System>) -> Result<SystemId, EcsError> {
        let mask = self.world.resolve(&system.requirements())?;
        let id = self.world.register_system_filter(mask);
        log::info!("added system {} ({} components required)", system.name(), mask.count());

        if system.as_renderable().is_some() {
            self.renderables.push(self.systems.len());
        }
        self.systems.push(SystemEntry {
            id,
            system,
            snapshot: Vec::new(),
        });
        Ok(id)
    }

    /// Number of registered systems
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// First system of type `S`
    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems
            .iter()
            .find_map(|entry| entry.system.as_any().downcast_ref::<S>())
    }

    /// First system of type `S`, mutably
    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .iter_mut()
            .find_map(|entry| entry.system.as_any_mut().downcast_mut::<S>())
    }

    /// Entities currently matching a system
    pub fn system_entities(&self, id: SystemId) -> &[Entity] {
        self.world.members(id)
    }

    /// Make `camera` the only active camera.
    ///
    /// Returns false when the entity has no camera component.
    pub fn set_active_camera(&mut self, camera: Entity) -> bool {
        if !self.world.has_component::<CameraComponent>(camera) {
            return false;
        }
        for (entity, component) in self.world.query_mut::<CameraComponent>() {
            component.active = entity == camera;
        }
        true
    }

    /// First active camera, if any
    pub fn active_camera(&self) -> Option<Entity> {
        self.collect_cameras().into_iter().next()
    }

    /// Cameras the last frame built draw lists for
    pub fn cameras(&self) -> &[Entity] {
        &self.cameras
    }

    /// Update every viewport-dependent camera after a resize
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        for (_, camera) in self.world.query_mut::<CameraComponent>() {
            camera.set_viewport(width, height);
        }
    }

    /// Advance the scene by `dt` seconds
    pub fn simulate(&mut self, dt: f32) {
        let stopwatch = Stopwatch::start_new();
        self.frame += 1;

        self.messages.begin_frame();
        self.dispatch_membership();
        self.deliver_messages();

        for index in 0..self.systems.len() {
            self.dispatch_membership();
            let entry = &mut self.systems[index];
            entry.refresh(&self.world);
            let SystemEntry { system, snapshot, .. } = entry;
            let mut ctx = SystemContext::new(
                &mut self.world,
                &mut self.messages,
                &self.resources,
                snapshot.as_slice(),
                self.frame,
            );
            system.process(&mut ctx, dt);
        }
        self.dispatch_membership();

        self.cameras = self.collect_cameras();
        let mut cull = CullStats::default();
        for &index in &self.renderables {
            let entry = &mut self.systems[index];
            entry.refresh(&self.world);
            let SystemEntry { system, snapshot, .. } = entry;
            let Some(renderable) = system.as_renderable_mut() else {
                continue;
            };
            renderable.prepare(&self.world, &self.resources, snapshot.as_slice());
            for &camera in &self.cameras {
                cull += renderable.update_draw_list(&self.world, &self.resources, camera);
            }
        }

        self.stats.frame = self.frame;
        self.stats.entity_count = self.world.entity_count();
        self.stats.system_count = self.systems.len();
        self.stats.messages_delivered = self.messages.delivered_len();
        self.stats.messages_dropped = self.messages.dropped();
        self.stats.camera_count = self.cameras.len();
        self.stats.cull = cull;
        self.stats.simulate_micros = stopwatch.elapsed_micros();
        log::trace!(
            "frame {}: {} entities, {} visible, {} culled",
            self.frame,
            self.stats.entity_count,
            cull.visible,
            cull.culled
        );
    }

    /// Draw every renderable system for every camera of the last `simulate`
    pub fn render(&mut self, backend: &mut dyn RenderBackend) -> BackendResult<RenderStats> {
        let stopwatch = Stopwatch::start_new();
        let mut stats = RenderStats::default();

        backend.begin_frame()?;
        for &index in &self.renderables {
            let Some(renderable) = self.systems[index].system.as_renderable() else {
                continue;
            };
            for &camera in &self.cameras {
                stats += renderable.render(&self.world, &self.resources, camera, backend)?;
            }
        }
        backend.end_frame()?;

        self.stats.render = stats;
        self.stats.render_micros = stopwatch.elapsed_micros();
        Ok(stats)
    }

    fn collect_cameras(&self) -> Vec<Entity> {
        let mut cameras: Vec<Entity> = self
            .world
            .query::<CameraComponent>()
            .filter(|(entity, camera)| camera.active && self.world.has_component::<TransformComponent>(*entity))
            .map(|(entity, _)| entity)
            .collect();
        cameras.sort_unstable();
        cameras
    }

    fn deliver_messages(&mut self) {
        if self.messages.delivered_len() == 0 {
            return;
        }
        for entry in &mut self.systems {
            entry.refresh(&self.world);
        }
        for i in 0..self.messages.delivered_len() {
            let Some(message) = self.messages.delivered(i).copied() else {
                break;
            };
            for entry in &mut self.systems {
                let SystemEntry { system, snapshot, .. } = entry;
                let mut ctx = SystemContext::new(
                    &mut self.world,
                    &mut self.messages,
                    &self.resources,
                    snapshot.as_slice(),
                    self.frame,
                );
                system.handle_message(&mut ctx, &message);
            }
        }
    }

    fn dispatch_membership(&mut self) {
        let mut rounds = 0;
        while self.world.has_membership_events() {
            if rounds == MAX_MEMBERSHIP_ROUNDS {
                log::warn!("membership callbacks still changing components after {} rounds", rounds);
                return;
            }
            rounds += 1;

            self.world.take_membership_events(&mut self.membership);
            for event in self.membership.drain(..) {
                let Some(entry) = self.systems.iter_mut().find(|entry| entry.id == event.system) else {
                    continue;
                };
                log::debug!("{} {:?} {}", entry.system.name(), event.change, event.entity);
                match event.change {
                    MembershipChange::Added => entry.system.on_entity_added(&mut self.world, event.entity),
                    MembershipChange::Removed => entry.system.on_entity_removed(event.entity),
                }
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::Requirements;
    use crate::events::{Message, MessageData, MessageKind};
    use bytemuck::{Pod, Zeroable};
    use std::any::Any;
    use std::sync::{Arc, Mutex};

    #[repr(C)]
    #[derive(Debug, Clone, Copy, Pod, Zeroable)]
    struct Ping {
        value: u32,
    }

    impl MessageData for Ping {
        const KIND: MessageKind = MessageKind::user(1);
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Tag;

    impl Component for Tag {}

    type Log = Arc<Mutex<Vec<String>>>;

    struct Probe {
        label: &'static str,
        log: Log,
        post_on_process: Option<u32>,
    }

    impl Probe {
        fn new(label: &'static str, log: &Log) -> Self {
            Self {
                label,
                log: Arc::clone(log),
                post_on_process: None,
            }
        }

        fn push(&self, line: String) {
            self.log.lock().unwrap().push(line);
        }
    }

    impl System for Probe {
        fn requirements(&self) -> Requirements {
            Requirements::new().require::<Tag>()
        }

        fn process(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) {
            self.push(format!("{} process {}", self.label, ctx.entities().len()));
            if let Some(value) = self.post_on_process.take() {
                ctx.messages.post_value(Ping { value }).unwrap();
            }
        }

        fn handle_message(&mut self, _ctx: &mut SystemContext<'_>, message: &Message) {
            if let Some(ping) = message.data::<Ping>() {
                self.push(format!("{} ping {}", self.label, ping.value));
            }
        }

        fn on_entity_added(&mut self, _world: &mut World, entity: Entity) {
            self.push(format!("{} added {}", self.label, entity));
        }

        fn on_entity_removed(&mut self, entity: Entity) {
            self.push(format!("{} removed {}", self.label, entity));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn drain(log: &Log) -> Vec<String> {
        std::mem::take(&mut *log.lock().unwrap())
    }

    #[test]
    fn test_systems_run_in_registration_order() {
        let log = Log::default();
        let mut scene = Scene::default();
        scene.add_system(Box::new(Probe::new("a", &log))).unwrap();
        scene.add_system(Box::new(Probe::new("b", &log))).unwrap();

        scene.simulate(0.016);
        assert_eq!(drain(&log), vec!["a process 0", "b process 0"]);
        assert_eq!(scene.frame(), 1);
    }

    #[test]
    fn test_membership_callbacks_before_process() {
        let log = Log::default();
        let mut scene = Scene::default();
        let id = scene.add_system(Box::new(Probe::new("a", &log))).unwrap();

        let entity = scene.create_entity();
        scene.add_component(entity, Tag).unwrap();
        assert_eq!(scene.system_entities(id), &[entity]);

        scene.simulate(0.016);
        assert_eq!(drain(&log), vec![format!("a added {}", entity), "a process 1".to_string()]);

        scene.destroy_entity(entity).unwrap();
        assert!(scene.system_entities(id).is_empty());
        scene.simulate(0.016);
        assert_eq!(drain(&log), vec![format!("a removed {}", entity), "a process 0".to_string()]);
    }

    #[test]
    fn test_messages_arrive_next_frame() {
        let log = Log::default();
        let mut scene = Scene::default();
        let mut sender = Probe::new("a", &log);
        sender.post_on_process = Some(7);
        scene.add_system(Box::new(sender)).unwrap();
        scene.add_system(Box::new(Probe::new("b", &log))).unwrap();

        scene.simulate(0.016);
        assert_eq!(drain(&log), vec!["a process 0", "b process 0"]);

        scene.simulate(0.016);
        assert_eq!(drain(&log), vec!["a ping 7", "b ping 7", "a process 0", "b process 0"]);
        assert_eq!(scene.stats().messages_delivered, 1);

        scene.simulate(0.016);
        assert_eq!(drain(&log), vec!["a process 0", "b process 0"]);
    }

    #[test]
    fn test_typed_system_lookup() {
        let log = Log::default();
        let mut scene = Scene::default();
        scene.add_system(Box::new(Probe::new("a", &log))).unwrap();

        assert_eq!(scene.system::<Probe>().map(|probe| probe.label), Some("a"));
        scene.system_mut::<Probe>().unwrap().label = "renamed";
        assert_eq!(scene.system::<Probe>().unwrap().label, "renamed");
    }

    #[test]
    fn test_single_active_camera() {
        let mut scene = Scene::default();
        let first = scene.create_entity();
        let second = scene.create_entity();
        for camera in [first, second] {
            scene.add_component(camera, TransformComponent::identity()).unwrap();
            scene.add_component(camera, CameraComponent::default()).unwrap();
        }
        assert_eq!(scene.active_camera(), Some(first));

        assert!(scene.set_active_camera(second));
        assert_eq!(scene.active_camera(), Some(second));
        assert!(!scene.get_component::<CameraComponent>(first).unwrap().active);

        let plain = scene.create_entity();
        assert!(!scene.set_active_camera(plain));
    }

    #[test]
    fn test_stale_destroy_is_an_error() {
        let mut scene = Scene::default();
        let entity = scene.create_entity();
        scene.destroy_entity(entity).unwrap();
        assert_eq!(scene.destroy_entity(entity), Err(EcsError::StaleEntity(entity)));
    }
}
