//! Both culling strategies must agree with a brute-force frustum test

use std::collections::BTreeSet;

use kestrel_engine::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const MODELS: usize = 400;

struct Field {
    scene: Scene,
    camera: Entity,
    models: Vec<Entity>,
}

impl Field {
    fn new(strategy: CullStrategy, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = Scene::new(SceneConfig::default().with_cull_strategy(strategy));
        scene
            .add_system(Box::new(ModelRenderer::new(&scene.config().culling)))
            .unwrap();

        let small = AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5));
        let long = AABB::from_center_extents(Vec3::zeros(), Vec3::new(6.0, 0.25, 0.25));
        let meshes = [
            scene.resources_mut().add_mesh(MeshData::new(1, small)),
            scene.resources_mut().add_mesh(MeshData::new(2, long)),
        ];
        let materials = [
            scene.resources_mut().add_material(MaterialData::new(ShaderId(0))),
            scene.resources_mut().add_material(MaterialData::new(ShaderId(1))),
            scene
                .resources_mut()
                .add_material(MaterialData::new(ShaderId(2)).with_blend_mode(BlendMode::Alpha)),
        ];

        let camera = scene.create_entity();
        scene
            .add_component(
                camera,
                TransformComponent::look_at(Vec3::new(0.0, 5.0, 40.0), Vec3::zeros(), Vec3::y()),
            )
            .unwrap();
        scene
            .add_component(camera, CameraComponent::perspective(50.0, 1.5, 0.5, 120.0))
            .unwrap();

        let mut models = Vec::with_capacity(MODELS);
        for _ in 0..MODELS {
            let entity = scene.create_entity();
            let position = Vec3::new(
                rng.gen_range(-150.0..150.0),
                rng.gen_range(-40.0..40.0),
                rng.gen_range(-150.0..150.0),
            );
            let transform = TransformComponent::from_position(position)
                .with_rotation_axis_angle(Vec3::y(), rng.gen_range(0.0..std::f32::consts::TAU))
                .with_uniform_scale(rng.gen_range(0.25..3.0));
            let mesh = meshes[rng.gen_range(0..meshes.len())];
            let material = materials[rng.gen_range(0..materials.len())];
            scene.add_component(entity, transform).unwrap();
            scene
                .add_component(entity, ModelComponent::new(mesh, vec![material]))
                .unwrap();
            models.push(entity);
        }

        Self { scene, camera, models }
    }

    fn drift(&mut self, rng: &mut StdRng) {
        for &entity in &self.models {
            let offset = Vec3::new(
                rng.gen_range(-4.0..4.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-4.0..4.0),
            );
            if let Some(transform) = self.scene.get_component_mut::<TransformComponent>(entity) {
                transform.translate(offset);
            }
        }
    }

    fn draw_lists(&self) -> (Vec<Entity>, Vec<Entity>) {
        let renderer = self.scene.system::<ModelRenderer>().unwrap();
        let opaque = renderer
            .opaque_list(self.camera)
            .map(|list| list.iter().map(|pair| pair.entity).collect())
            .unwrap_or_default();
        let transparent = renderer
            .transparent_list(self.camera)
            .map(|list| list.iter().map(|pair| pair.entity).collect())
            .unwrap_or_default();
        (opaque, transparent)
    }

    fn brute_force_visible(&self) -> BTreeSet<Entity> {
        let scene = &self.scene;
        let camera = scene.get_component::<CameraComponent>(self.camera).unwrap();
        let eye = scene.get_component::<TransformComponent>(self.camera).unwrap();
        let frustum = camera.frustum(eye);

        self.models
            .iter()
            .copied()
            .filter(|&entity| {
                let transform = scene.get_component::<TransformComponent>(entity).unwrap();
                let model = scene.get_component::<ModelComponent>(entity).unwrap();
                let mesh = scene.resources().mesh(model.mesh).unwrap();
                frustum.intersects_aabb(&mesh.bounds.transformed(&transform.to_matrix()))
            })
            .collect()
    }
}

#[test]
fn tree_and_linear_cull_identically() {
    let mut linear = Field::new(CullStrategy::Linear, 11);
    let mut tree = Field::new(CullStrategy::BalancedTree, 11);
    let mut linear_rng = StdRng::seed_from_u64(99);
    let mut tree_rng = StdRng::seed_from_u64(99);

    for frame in 0..6 {
        linear.scene.simulate(1.0 / 30.0);
        tree.scene.simulate(1.0 / 30.0);

        let expected = linear.brute_force_visible();
        assert!(!expected.is_empty(), "camera sees nothing on frame {}", frame);

        let (opaque, transparent) = linear.draw_lists();
        let drawn: BTreeSet<Entity> = opaque.iter().chain(&transparent).copied().collect();
        assert_eq!(drawn, expected, "linear index on frame {}", frame);

        assert_eq!(tree.draw_lists(), (opaque, transparent), "tree index on frame {}", frame);
        assert_eq!(tree.scene.stats().cull.visible, linear.scene.stats().cull.visible);

        linear.drift(&mut linear_rng);
        tree.drift(&mut tree_rng);
    }
}

#[test]
fn removed_models_leave_the_tree() {
    let mut field = Field::new(CullStrategy::BalancedTree, 5);
    field.scene.simulate(0.016);
    let (before, _) = field.draw_lists();
    let victim = *before.first().unwrap();

    field.scene.destroy_entity(victim).unwrap();
    field.scene.simulate(0.016);

    let renderer = field.scene.system::<ModelRenderer>().unwrap();
    assert_eq!(renderer.indexed_count(), MODELS - 1);
    let (after, transparent) = field.draw_lists();
    assert!(!after.contains(&victim));
    assert!(!transparent.contains(&victim));
}
