//! Whole-frame behaviour of a scene: simulate, deliver, draw

use std::any::Any;
use std::sync::{Arc, Mutex};

use kestrel_engine::prelude::*;
use kestrel_engine::render::RenderPass;

#[derive(Debug, Clone, Copy)]
struct Doomed;

impl Component for Doomed {}

/// Destroys every entity tagged [`Doomed`] the frame it sees it
struct Reaper;

impl System for Reaper {
    fn requirements(&self) -> Requirements {
        Requirements::new().require::<Doomed>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) {
        for &entity in ctx.entities() {
            ctx.destroy_entity(entity).unwrap();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Records destruction notices with the frame they arrived in
#[derive(Default)]
struct Obituaries {
    seen: Arc<Mutex<Vec<(u64, Entity)>>>,
}

impl System for Obituaries {
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    fn handle_message(&mut self, ctx: &mut SystemContext<'_>, message: &Message) {
        if let Some(event) = message.data::<SceneEvent>() {
            assert_eq!(event.event, SceneEvent::ENTITY_DESTROYED);
            self.seen.lock().unwrap().push((ctx.frame, event.entity));
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Stage {
    scene: Scene,
    mesh: MeshId,
    camera: Entity,
}

impl Stage {
    fn new() -> Self {
        let mut scene = Scene::default();
        let unit = AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5));
        let mesh = scene.resources_mut().add_mesh(MeshData::new(1, unit));
        scene
            .add_system(Box::new(ModelRenderer::new(&scene.config().culling)))
            .unwrap();

        let camera = scene.create_entity();
        scene
            .add_component(
                camera,
                TransformComponent::look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y()),
            )
            .unwrap();
        scene.add_component(camera, CameraComponent::default()).unwrap();

        Self { scene, mesh, camera }
    }

    fn material(&mut self, shader: u32, blend_mode: BlendMode) -> MaterialId {
        self.scene
            .resources_mut()
            .add_material(MaterialData::new(ShaderId(shader)).with_blend_mode(blend_mode))
    }

    fn model(&mut self, z: f32, material: MaterialId) -> Entity {
        let entity = self.scene.create_entity();
        self.scene
            .add_component(entity, TransformComponent::from_position(Vec3::new(0.0, 0.0, z)))
            .unwrap();
        self.scene
            .add_component(entity, ModelComponent::new(self.mesh, vec![material]))
            .unwrap();
        entity
    }

    fn frame(&mut self) -> CommandRecorder {
        let mut recorder = CommandRecorder::new();
        self.scene.simulate(1.0 / 60.0);
        self.scene.render(&mut recorder).unwrap();
        recorder
    }
}

#[test]
fn transparent_models_draw_far_to_near() {
    let mut stage = Stage::new();
    let glass = stage.material(1, BlendMode::Alpha);
    let near = stage.model(0.0, glass);
    let far = stage.model(-20.0, glass);
    let middle = stage.model(-10.0, glass);

    let recorder = stage.frame();
    assert_eq!(recorder.draw_order(RenderPass::Transparent), vec![far, middle, near]);
    assert!(recorder.draw_order(RenderPass::Opaque).is_empty());
    assert_eq!(recorder.bind_count(), 1);
}

#[test]
fn opaque_models_group_by_material_then_depth() {
    let mut stage = Stage::new();
    let first = stage.material(1, BlendMode::Opaque);
    let second = stage.material(2, BlendMode::Opaque);
    let glass = stage.material(3, BlendMode::Additive);

    let second_near = stage.model(0.0, second);
    let first_far = stage.model(-8.0, first);
    let first_near = stage.model(2.0, first);
    let blended = stage.model(-4.0, glass);

    let recorder = stage.frame();
    assert_eq!(
        recorder.draw_order(RenderPass::Opaque),
        vec![first_near, first_far, second_near]
    );
    assert_eq!(recorder.draw_order(RenderPass::Transparent), vec![blended]);

    let stats = stage.scene.stats();
    assert_eq!(stats.camera_count, 1);
    assert_eq!(stats.cull.visible, 4);
    assert_eq!(stats.render.draw_calls, 4);
    assert_eq!(stats.render.material_binds, 3);
}

#[test]
fn models_behind_the_camera_are_not_drawn() {
    let mut stage = Stage::new();
    let material = stage.material(1, BlendMode::Opaque);
    let ahead = stage.model(0.0, material);
    stage.model(30.0, material);

    let recorder = stage.frame();
    assert_eq!(recorder.draw_order(RenderPass::Opaque), vec![ahead]);
    assert_eq!(stage.scene.stats().cull.culled, 1);
}

#[test]
fn inactive_camera_gets_no_draws() {
    let mut stage = Stage::new();
    let material = stage.material(1, BlendMode::Opaque);
    stage.model(0.0, material);

    stage
        .scene
        .get_component_mut::<CameraComponent>(stage.camera)
        .unwrap()
        .active = false;
    let recorder = stage.frame();
    assert_eq!(recorder.draw_count(), 0);
    assert_eq!(stage.scene.stats().camera_count, 0);

    assert!(stage.scene.set_active_camera(stage.camera));
    let recorder = stage.frame();
    assert_eq!(recorder.draw_count(), 1);
}

#[test]
fn destruction_is_announced_next_frame() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut scene = Scene::default();
    scene.add_system(Box::new(Reaper)).unwrap();
    scene
        .add_system(Box::new(Obituaries {
            seen: Arc::clone(&seen),
        }))
        .unwrap();

    let doomed = scene.create_entity();
    scene.add_component(doomed, Doomed).unwrap();
    let bystander = scene.create_entity();

    scene.simulate(0.016);
    assert!(!scene.world().is_alive(doomed));
    assert!(seen.lock().unwrap().is_empty());

    scene.simulate(0.016);
    assert_eq!(*seen.lock().unwrap(), vec![(2, doomed)]);

    scene.destroy_entity(bystander).unwrap();
    scene.simulate(0.016);
    assert_eq!(seen.lock().unwrap().last(), Some(&(3, bystander)));
    assert_eq!(scene.stats().messages_delivered, 1);
    assert_eq!(scene.stats().entity_count, 0);
}

#[test]
fn stale_handles_are_rejected() {
    let mut scene = Scene::new(SceneConfig::default().with_min_free_indices(0));
    let first = scene.create_entity();
    scene.add_component(first, TransformComponent::identity()).unwrap();
    scene.destroy_entity(first).unwrap();

    let second = scene.create_entity();
    assert_eq!(second.index(), first.index());
    assert_ne!(second, first);

    assert!(scene.get_component::<TransformComponent>(first).is_none());
    assert_eq!(
        scene.add_component(first, TransformComponent::identity()),
        Err(EcsError::StaleEntity(first))
    );
    assert_eq!(scene.destroy_entity(first), Err(EcsError::StaleEntity(first)));
}

#[derive(Debug, Clone, Copy)]
struct Runaway;

impl Component for Runaway {}

/// Moves tagged models in front of the stage camera
struct Mover;

impl System for Mover {
    fn requirements(&self) -> Requirements {
        Requirements::new().require::<TransformComponent>().require::<Runaway>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) {
        for &entity in ctx.entities() {
            if let Some(transform) = ctx.world.get_component_mut::<TransformComponent>(entity) {
                transform.position = Vec3::new(0.0, 0.0, -5.0);
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

#[test]
fn moves_after_the_renderer_are_culled_where_they_end_up() {
    let mut stage = Stage::new();
    stage.scene.add_system(Box::new(Mover)).unwrap();
    let material = stage.material(1, BlendMode::Opaque);
    let entity = stage.model(50.0, material);
    stage.scene.add_component(entity, Runaway).unwrap();

    let recorder = stage.frame();
    assert_eq!(recorder.draw_order(RenderPass::Opaque), vec![entity]);
    assert_eq!(stage.scene.stats().cull.visible, 1);
    assert_eq!(stage.scene.stats().cull.culled, 0);
}

#[test]
fn camera_destroyed_before_render_draws_nothing() {
    let mut stage = Stage::new();
    let material = stage.material(1, BlendMode::Opaque);
    stage.model(0.0, material);

    stage.scene.simulate(1.0 / 60.0);
    assert_eq!(stage.scene.stats().cull.visible, 1);
    stage.scene.destroy_entity(stage.camera).unwrap();

    let mut recorder = CommandRecorder::new();
    let stats = stage.scene.render(&mut recorder).unwrap();
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(recorder.draw_count(), 0);

    let recorder = stage.frame();
    assert_eq!(recorder.draw_count(), 0);
    assert_eq!(stage.scene.stats().camera_count, 0);
}
