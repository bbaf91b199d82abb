//! Headless scene demo
//!
//! Spawns a drifting debris field around an orbiting camera, an animated
//! sprite and a terrain patch, then runs the engine loop against a command
//! recorder and reports what the scene did.
//!
//! Pass a `.toml` or `.ron` engine config as the first argument to override
//! the defaults.

use std::any::Any;

use kestrel_engine::foundation::logging;
use kestrel_engine::prelude::*;
use kestrel_engine::scene::SceneStats;
use rand::Rng;

const DEBRIS_COUNT: usize = 200;
const FIELD_RADIUS: f32 = 60.0;
const ORBIT_RADIUS: f32 = 90.0;
const STATS_INTERVAL: u64 = 120;
const SPARK_EVENT: i32 = 7;

/// Velocity and remaining life of a piece of debris
#[derive(Debug, Clone)]
struct DriftComponent {
    velocity: Vec3,
    spin: f32,
    remaining: f32,
}

impl Component for DriftComponent {}

/// Moves debris, expires it and counts the notifications that come back
#[derive(Debug, Default)]
struct DebrisSystem {
    expired: u64,
    destroyed_seen: u64,
    sparks_seen: u64,
}

impl System for DebrisSystem {
    fn name(&self) -> &str {
        "DebrisSystem"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new()
            .require::<TransformComponent>()
            .require::<DriftComponent>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, dt: f32) {
        for &entity in ctx.entities() {
            let Some((transform, drift)) = ctx
                .world
                .get_two_mut::<TransformComponent, DriftComponent>(entity)
            else {
                continue;
            };

            transform.translate(drift.velocity * dt);
            transform.rotate(Vec3::y(), drift.spin * dt);
            drift.remaining -= dt;

            if drift.remaining <= 0.0 {
                if let Err(e) = ctx.destroy_entity(entity) {
                    log::warn!("Failed to expire debris {}: {}", entity, e);
                    continue;
                }
                self.expired += 1;
            }
        }
    }

    fn handle_message(&mut self, _ctx: &mut SystemContext<'_>, message: &Message) {
        if let Some(event) = message.data::<SceneEvent>() {
            if event.event == SceneEvent::ENTITY_DESTROYED {
                self.destroyed_seen += 1;
            }
        } else if let Some(event) = message.data::<SpriteAnimationEvent>() {
            if event.user_type == SPARK_EVENT {
                self.sparks_seen += 1;
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

/// Demo application state
struct DebrisFieldApp {
    meshes: Vec<MeshId>,
    opaque: Vec<MaterialId>,
    glass: Option<MaterialId>,
    terrain: Option<Entity>,
    spawned: usize,
}

impl DebrisFieldApp {
    fn new() -> Self {
        Self {
            meshes: Vec::new(),
            opaque: Vec::new(),
            glass: None,
            terrain: None,
            spawned: 0,
        }
    }

    fn load_resources(&mut self, resources: &mut ResourceManager) {
        let unit = AABB::from_center_extents(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        self.meshes.push(resources.add_mesh(MeshData::new(1, unit)));
        self.meshes.push(resources.add_mesh(MeshData::new(2, unit)));

        for shader in 0..3 {
            let material = MaterialData::new(ShaderId(shader)).with_texture(TextureId(shader));
            self.opaque.push(resources.add_material(material));
        }
        self.glass = Some(resources.add_material(
            MaterialData::new(ShaderId(10)).with_blend_mode(BlendMode::Alpha),
        ));
    }

    fn spawn_debris(&mut self, scene: &mut Scene) -> Result<Entity, AppError> {
        let mut rng = rand::thread_rng();

        let mesh = self.meshes[rng.gen_range(0..self.meshes.len())];
        let mut materials = vec![self.opaque[rng.gen_range(0..self.opaque.len())]];
        if let Some(glass) = self.glass.filter(|_| rng.gen_bool(0.25)) {
            materials.push(glass);
        }

        let position = Vec3::new(
            rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
            rng.gen_range(-FIELD_RADIUS * 0.25..FIELD_RADIUS * 0.25),
            rng.gen_range(-FIELD_RADIUS..FIELD_RADIUS),
        );
        let drift = DriftComponent {
            velocity: Vec3::new(rng.gen_range(-2.0..2.0), 0.0, rng.gen_range(-2.0..2.0)),
            spin: rng.gen_range(-1.0..1.0),
            remaining: rng.gen_range(2.0..12.0),
        };

        let entity = scene.create_entity();
        scene.add_component(
            entity,
            TransformComponent::from_position(position).with_uniform_scale(rng.gen_range(0.5..2.5)),
        )?;
        scene.add_component(entity, ModelComponent::new(mesh, materials))?;
        scene.add_component(entity, drift)?;
        self.spawned += 1;
        Ok(entity)
    }

    fn spawn_camera(scene: &mut Scene) -> Result<Entity, AppError> {
        let camera = scene.create_entity();
        scene.add_component(
            camera,
            TransformComponent::look_at(Vec3::new(0.0, 20.0, ORBIT_RADIUS), Vec3::zeros(), Vec3::y()),
        )?;
        scene.add_component(camera, CameraComponent::perspective(60.0, 16.0 / 9.0, 0.1, 500.0))?;

        let mut angle = 0.0f32;
        scene.add_component(
            camera,
            CallbackComponent::new(move |entity, world: &mut World, dt| {
                angle += dt * 0.2;
                let eye = Vec3::new(angle.sin() * ORBIT_RADIUS, 20.0, angle.cos() * ORBIT_RADIUS);
                if let Some(transform) = world.get_component_mut::<TransformComponent>(entity) {
                    *transform = TransformComponent::look_at(eye, Vec3::zeros(), Vec3::y());
                }
            }),
        )?;
        Ok(camera)
    }

    fn spawn_beacon(scene: &mut Scene) -> Result<Entity, AppError> {
        let frames = (0..4)
            .map(|i| {
                let frame = AnimationFrame::new(TextureRect::new(i as f32 * 16.0, 0.0, 16.0, 16.0));
                if i == 2 {
                    frame.with_event(SPARK_EVENT)
                } else {
                    frame
                }
            })
            .collect();
        let sprite = SpriteComponent::new(TextureId(20), Vec2::new(64.0, 16.0))
            .with_animation(AnimationClip::new(frames, 8.0).looped(0));

        let mut animation = SpriteAnimationComponent::default();
        animation.play(0);

        let beacon = scene.create_entity();
        scene.add_component(beacon, TransformComponent::from_position(Vec3::new(0.0, 15.0, 0.0)))?;
        scene.add_component(beacon, sprite)?;
        scene.add_component(beacon, animation)?;
        Ok(beacon)
    }

    fn log_stats(stats: &SceneStats) {
        log::info!(
            "frame {}: {} entities, {} visible / {} culled / {} unready, {} draws, {} binds, {} messages",
            stats.frame,
            stats.entity_count,
            stats.cull.visible,
            stats.cull.culled,
            stats.cull.unready,
            stats.render.draw_calls,
            stats.render.material_binds,
            stats.messages_delivered,
        );
        log::debug!(
            "simulate {}us, render {}us",
            stats.simulate_micros,
            stats.render_micros
        );
    }
}

impl Application for DebrisFieldApp {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        log::info!("Initializing debris field...");
        let scene = engine.scene_mut();
        self.load_resources(scene.resources_mut());

        scene.add_system(Box::new(CallbackSystem::new()))?;
        scene.add_system(Box::new(DebrisSystem::default()))?;
        scene.add_system(Box::new(SpriteAnimator::new()))?;
        scene.add_system(Box::new(SpriteSystem::new()))?;
        scene.add_system(Box::new(TerrainSystem::new()?))?;
        let renderer = ModelRenderer::new(&scene.config().culling);
        log::info!("Model renderer culling with {:?}", renderer.strategy());
        scene.add_system(Box::new(renderer))?;

        let camera = Self::spawn_camera(scene)?;
        scene.set_active_camera(camera);
        Self::spawn_beacon(scene)?;

        let terrain = scene.create_entity();
        scene.add_component(terrain, TransformComponent::from_position(Vec3::new(0.0, -20.0, 0.0)))?;
        scene.add_component(terrain, TerrainComponent::new(TerrainParams::default()))?;
        self.terrain = Some(terrain);

        for _ in 0..DEBRIS_COUNT {
            self.spawn_debris(scene)?;
        }

        log::info!("Spawned {} entities", scene.world().entity_count());
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
        let frame = engine.frame_count();
        let scene = engine.scene_mut();

        let live = scene
            .system::<DebrisSystem>()
            .map_or(0, |debris| self.spawned as u64 - debris.expired) as usize;
        for _ in live..DEBRIS_COUNT {
            self.spawn_debris(scene)?;
        }

        if frame > 0 && frame % (STATS_INTERVAL * 2) == 0 {
            if let Some(terrain) = self.terrain.and_then(|t| scene.get_component_mut::<TerrainComponent>(t)) {
                let mut params = *terrain.params();
                params.seed = params.seed.wrapping_add(1);
                terrain.set_params(params);
                log::debug!("Terrain reseeded to {}", params.seed);
            }
        }

        if frame % STATS_INTERVAL == 0 {
            Self::log_stats(scene.stats());
        }
        Ok(())
    }

    fn render(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        engine.render()?;
        if engine.frame_count() == 0 {
            let scene = engine.scene();
            let opaque = scene
                .system::<ModelRenderer>()
                .zip(scene.active_camera())
                .and_then(|(renderer, camera)| renderer.opaque_list(camera))
                .map_or(0, |list| list.len());
            log::debug!("First frame drew {} opaque models", opaque);
        }
        Ok(())
    }

    fn cleanup(&mut self, engine: &mut Engine) {
        let scene = engine.scene();
        Self::log_stats(scene.stats());

        if let Some(debris) = scene.system::<DebrisSystem>() {
            log::info!(
                "Debris: {} spawned, {} expired, {} destruction notices, {} beacon sparks",
                self.spawned,
                debris.expired,
                debris.destroyed_seen,
                debris.sparks_seen
            );
        }
        if let Some(terrain) = scene.system::<TerrainSystem>() {
            log::info!("Terrain: {} meshes built, {} discarded", terrain.completed(), terrain.discarded());
        }
        if let Some(animator) = scene.system::<SpriteAnimator>() {
            if animator.fault_count() > 0 {
                log::warn!("Sprite animator reported {} faults", animator.fault_count());
            }
        }

        let mut clock = SysTime::global();
        log::info!(
            "Debris field finished at {} {} ({})",
            clock.date_string(),
            clock.time_string(),
            clock.utc_offset()
        );
    }
}

fn default_config() -> EngineConfig {
    EngineConfig::new()
        .with_max_frames(600)
        .with_fixed_timestep(1.0 / 60.0)
        .with_scene(SceneConfig::default().with_cull_strategy(CullStrategy::BalancedTree))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => default_config(),
    };

    logging::init_with_level(&config.log_level);
    log::info!("Starting Kestrel scene demo");
    if let Some(path) = &config_path {
        log::info!("Loaded engine config from {}", path);
    }

    let mut app = DebrisFieldApp::new();

    match Engine::run(config, Box::new(CommandRecorder::new()), &mut app) {
        Ok(()) => {
            log::info!("Scene demo completed successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scene demo failed: {}", e);
            Err(Box::new(e))
        }
    }
}
