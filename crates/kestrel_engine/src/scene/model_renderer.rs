//! Model culling, sorting and drawing
//!
//! Once per frame, after every system has run, the renderer refreshes the
//! world bounds of its models in a spatial index. For each camera it then
//! queries the index with the camera
//! frustum, splits the survivors into an opaque and a transparent list and
//! sorts them:
//!
//! - opaque entries ascend by `material << 32 | depth`, grouping draws by
//!   material and drawing near objects first within a material
//! - transparent entries descend by `blend priority << 32 | depth`, so far
//!   objects are blended before near ones
//!
//! Depth is the distance along the camera's forward axis in thousandths of a
//! unit. Each camera has a front pair of lists, which is what gets drawn, and
//! a back pair that is rebuilt and then swapped in.

use std::any::Any;
use std::collections::HashMap;

use super::draw_list::DrawList;
use super::renderable::{CullStats, RenderStats, Renderable};
use crate::core::CullingConfig;
use crate::ecs::components::{CameraComponent, ModelComponent, TransformComponent};
use crate::ecs::{Entity, Requirements, System, World};
use crate::render::{material_ordinal, BackendResult, MaterialId, RenderBackend, RenderPass, ResourceManager};
use crate::spatial::{create_index, CullStrategy, SpatialIndex};

const DEPTH_SCALE: f32 = 1000.0;

/// Distance along the view axis as a sortable integer
pub fn quantize_depth(depth: f32) -> u32 {
    (depth * DEPTH_SCALE).clamp(0.0, u32::MAX as f32) as u32
}

#[derive(Debug, Default)]
struct PassLists {
    opaque: DrawList,
    transparent: DrawList,
}

impl PassLists {
    fn clear(&mut self) {
        self.opaque.clear();
        self.transparent.clear();
    }
}

#[derive(Debug, Default)]
struct CameraLists {
    front: PassLists,
    back: PassLists,
}

/// Draws every entity with a transform and a model
pub struct ModelRenderer {
    index: Box<dyn SpatialIndex>,
    strategy: CullStrategy,
    lists: HashMap<Entity, CameraLists>,
    candidates: Vec<Entity>,
    unready: usize,
}

impl ModelRenderer {
    /// Create a renderer using the configured spatial index
    pub fn new(config: &CullingConfig) -> Self {
        log::debug!("model renderer culling with {:?}", config.strategy);
        Self {
            index: create_index(config),
            strategy: config.strategy,
            lists: HashMap::new(),
            candidates: Vec::new(),
            unready: 0,
        }
    }

    /// Index in use
    pub fn strategy(&self) -> CullStrategy {
        self.strategy
    }

    /// Entities currently in the spatial index
    pub fn indexed_count(&self) -> usize {
        self.index.entity_count()
    }

    /// Models skipped by the last `prepare` because their mesh was not ready
    pub fn unready_count(&self) -> usize {
        self.unready
    }

    /// Opaque list last built for `camera`
    pub fn opaque_list(&self, camera: Entity) -> Option<&DrawList> {
        self.lists.get(&camera).map(|lists| &lists.front.opaque)
    }

    /// Transparent list last built for `camera`
    pub fn transparent_list(&self, camera: Entity) -> Option<&DrawList> {
        self.lists.get(&camera).map(|lists| &lists.front.transparent)
    }

    /// Cameras with draw lists
    pub fn camera_count(&self) -> usize {
        self.lists.len()
    }

    fn material_for(model: &ModelComponent, submesh: u32) -> Option<MaterialId> {
        let last = model.materials.len().checked_sub(1)?;
        Some(model.materials[(submesh as usize).min(last)])
    }

    // Returns false when a mesh or material is missing or still loading
    fn classify(
        back: &mut PassLists,
        resources: &ResourceManager,
        entity: Entity,
        model: &ModelComponent,
        depth: i64,
    ) -> bool {
        let Some(mesh) = resources.ready_mesh(model.mesh) else {
            return false;
        };
        for submesh in 0..mesh.submesh_count {
            let ready = Self::material_for(model, submesh).and_then(|id| resources.ready_material(id));
            if ready.is_none() {
                return false;
            }
        }

        let mut opaque_started = false;
        let mut transparent_started = false;
        for submesh in 0..mesh.submesh_count {
            let Some(id) = Self::material_for(model, submesh) else {
                continue;
            };
            let Some(material) = resources.material(id) else {
                continue;
            };
            let list = if material.blend_mode.is_transparent() {
                if !transparent_started {
                    back.transparent.push(entity, (material.blend_mode.priority() << 32) | depth);
                    transparent_started = true;
                }
                &mut back.transparent
            } else {
                if !opaque_started {
                    let ordinal = i64::from(material_ordinal(id) & 0x7fff_ffff);
                    back.opaque.push(entity, (ordinal << 32) | depth);
                    opaque_started = true;
                }
                &mut back.opaque
            };
            if let Some(sort) = list.last_mut() {
                sort.submeshes.push((submesh, id));
            }
        }
        true
    }

    fn render_pass(
        list: &DrawList,
        pass: RenderPass,
        world: &World,
        resources: &ResourceManager,
        backend: &mut dyn RenderBackend,
        stats: &mut RenderStats,
    ) -> BackendResult<()> {
        let mut bound: Option<MaterialId> = None;
        for entry in list.iter() {
            let (Some(transform), Some(model)) = (
                world.get_component::<TransformComponent>(entry.entity),
                world.get_component::<ModelComponent>(entry.entity),
            ) else {
                stats.skipped += 1;
                continue;
            };
            let matrix = transform.to_matrix();
            for &(submesh, material_id) in &entry.sort.submeshes {
                if bound != Some(material_id) {
                    let Some(material) = resources.ready_material(material_id) else {
                        log::trace!("material of {} unloaded before drawing", entry.entity);
                        stats.skipped += 1;
                        continue;
                    };
                    backend.bind_material(material_id, material)?;
                    bound = Some(material_id);
                    stats.material_binds += 1;
                }
                backend.draw_submesh(entry.entity, model.mesh, submesh, &matrix)?;
                stats.draw_calls += 1;
            }
        }
        log::trace!("{:?} pass: {} entries", pass, list.len());
        Ok(())
    }
}

impl System for ModelRenderer {
    fn name(&self) -> &str {
        "ModelRenderer"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new()
            .require::<TransformComponent>()
            .require::<ModelComponent>()
    }

    fn on_entity_removed(&mut self, entity: Entity) {
        self.index.remove(entity);
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }

    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Renderable for ModelRenderer {
    fn prepare(&mut self, world: &World, resources: &ResourceManager, entities: &[Entity]) {
        self.unready = 0;
        for &entity in entities {
            let (Some(transform), Some(model)) = (
                world.get_component::<TransformComponent>(entity),
                world.get_component::<ModelComponent>(entity),
            ) else {
                self.index.remove(entity);
                continue;
            };
            match resources.ready_mesh(model.mesh) {
                Some(mesh) => {
                    let bounds = mesh.bounds.transformed(&transform.to_matrix());
                    self.index.update(entity, bounds);
                }
                None => {
                    log::trace!("mesh of {} not ready", entity);
                    self.index.remove(entity);
                    self.unready += 1;
                }
            }
        }

        let before = self.lists.len();
        self.lists.retain(|camera, _| world.has_component::<CameraComponent>(*camera));
        if self.lists.len() != before {
            log::debug!("dropped draw lists of {} cameras", before - self.lists.len());
        }
    }

    fn update_draw_list(&mut self, world: &World, resources: &ResourceManager, camera: Entity) -> CullStats {
        let (Some(camera_data), Some(camera_transform)) = (
            world.get_component::<CameraComponent>(camera),
            world.get_component::<TransformComponent>(camera),
        ) else {
            log::trace!("{} is not a usable camera", camera);
            return CullStats::default();
        };

        let frustum = camera_data.frustum(camera_transform);
        let eye = camera_transform.position;
        let forward = camera_transform.forward();

        self.candidates.clear();
        self.index.query_frustum(&frustum, &mut self.candidates);

        let indexed = self.index.entity_count();
        let mut stats = CullStats {
            indexed,
            candidates: self.candidates.len(),
            culled: indexed.saturating_sub(self.candidates.len()),
            ..CullStats::default()
        };

        let lists = self.lists.entry(camera).or_default();
        lists.back.clear();
        for &entity in &self.candidates {
            let Some(model) = world.get_component::<ModelComponent>(entity) else {
                continue;
            };
            if !model.visible || !model.render_flags.intersects(camera_data.render_flags) {
                stats.filtered += 1;
                continue;
            }

            let center = match self.index.bounds(entity) {
                Some(bounds) => bounds.center(),
                None => continue,
            };
            let depth = i64::from(quantize_depth((center - eye).dot(&forward)));
            if Self::classify(&mut lists.back, resources, entity, model, depth) {
                stats.visible += 1;
            } else {
                log::trace!("skipping {}: mesh or material not ready", entity);
                stats.unready += 1;
            }
        }

        lists.back.opaque.sort_ascending();
        lists.back.transparent.sort_descending();
        std::mem::swap(&mut lists.front, &mut lists.back);
        stats
    }

    fn render(
        &self,
        world: &World,
        resources: &ResourceManager,
        camera: Entity,
        backend: &mut dyn RenderBackend,
    ) -> BackendResult<RenderStats> {
        let mut stats = RenderStats::default();
        let Some(lists) = self.lists.get(&camera) else {
            return Ok(stats);
        };
        let (Some(camera_data), Some(camera_transform)) = (
            world.get_component::<CameraComponent>(camera),
            world.get_component::<TransformComponent>(camera),
        ) else {
            log::trace!("{} lost its camera before drawing", camera);
            return Ok(stats);
        };
        let view_projection = camera_data.view_projection(camera_transform);

        for (pass, list) in [
            (RenderPass::Opaque, &lists.front.opaque),
            (RenderPass::Transparent, &lists.front.transparent),
        ] {
            if list.is_empty() {
                continue;
            }
            backend.begin_pass(camera, pass, &view_projection)?;
            Self::render_pass(list, pass, world, resources, backend, &mut stats)?;
            backend.end_pass(pass)?;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::render::{BlendMode, CommandRecorder, MaterialData, MeshData, MeshId, ShaderId};
    use crate::ecs::components::RenderFlags;
    use crate::spatial::AABB;

    struct Fixture {
        world: World,
        resources: ResourceManager,
        renderer: ModelRenderer,
        camera: Entity,
        mesh: MeshId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = World::new();
            let mut resources = ResourceManager::new();
            let mesh = resources.add_mesh(MeshData::new(1, AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5))));

            let camera = world.create_entity();
            world.add_component(camera, TransformComponent::identity()).unwrap();
            world.add_component(camera, CameraComponent::default()).unwrap();

            Self {
                world,
                resources,
                renderer: ModelRenderer::new(&CullingConfig::default()),
                camera,
                mesh,
            }
        }

        fn model(&mut self, z: f32, material: MaterialId) -> Entity {
            let entity = self.world.create_entity();
            self.world
                .add_component(entity, TransformComponent::from_position(Vec3::new(0.0, 0.0, z)))
                .unwrap();
            self.world
                .add_component(entity, ModelComponent::new(self.mesh, vec![material]))
                .unwrap();
            entity
        }

        fn frame(&mut self) -> (CullStats, CommandRecorder) {
            let entities: Vec<Entity> = self.world.query::<ModelComponent>().map(|(e, _)| e).collect();
            self.renderer.prepare(&self.world, &self.resources, &entities);

            let stats = self.renderer.update_draw_list(&self.world, &self.resources, self.camera);
            let mut recorder = CommandRecorder::new();
            self.renderer
                .render(&self.world, &self.resources, self.camera, &mut recorder)
                .unwrap();
            (stats, recorder)
        }
    }

    #[test]
    fn test_transparent_far_before_near() {
        let mut fx = Fixture::new();
        let glass = fx
            .resources
            .add_material(MaterialData::new(ShaderId(0)).with_blend_mode(BlendMode::Alpha));
        let near = fx.model(-1.0, glass);
        let far = fx.model(-5.0, glass);

        let (stats, recorder) = fx.frame();
        assert_eq!(stats.visible, 2);
        assert_eq!(recorder.draw_order(RenderPass::Transparent), vec![far, near]);
    }

    #[test]
    fn test_opaque_grouped_by_material_then_near_first() {
        let mut fx = Fixture::new();
        let first = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        let second = fx.resources.add_material(MaterialData::new(ShaderId(1)));
        let a = fx.model(-8.0, second);
        let b = fx.model(-2.0, first);
        let c = fx.model(-6.0, first);
        let d = fx.model(-3.0, second);

        let (_, recorder) = fx.frame();
        assert_eq!(recorder.draw_order(RenderPass::Opaque), vec![b, c, d, a]);
        assert_eq!(recorder.bind_count(), 2);
        assert_eq!(recorder.draw_count(), 4);
    }

    #[test]
    fn test_behind_camera_culled() {
        let mut fx = Fixture::new();
        let material = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        fx.model(-4.0, material);
        fx.model(4.0, material);

        let (stats, _) = fx.frame();
        assert_eq!(stats.indexed, 2);
        assert_eq!(stats.visible, 1);
        assert_eq!(stats.culled, 1);
    }

    #[test]
    fn test_flags_and_visibility_filter() {
        let mut fx = Fixture::new();
        let material = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        let shadow_only = fx.model(-4.0, material);
        let hidden = fx.model(-5.0, material);
        fx.world
            .get_component_mut::<ModelComponent>(shadow_only)
            .unwrap()
            .render_flags = RenderFlags::SHADOW;
        fx.world.get_component_mut::<ModelComponent>(hidden).unwrap().set_visible(false);
        fx.world
            .get_component_mut::<CameraComponent>(fx.camera)
            .unwrap()
            .render_flags = RenderFlags::MAIN;

        let (stats, recorder) = fx.frame();
        assert_eq!(stats.filtered, 2);
        assert_eq!(recorder.draw_count(), 0);
    }

    #[test]
    fn test_unready_resources_skipped() {
        let mut fx = Fixture::new();
        let loading = fx
            .resources
            .add_material(MaterialData::new(ShaderId(0)).with_ready(false));
        let ready = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        fx.model(-4.0, loading);
        let drawn = fx.model(-5.0, ready);

        let (stats, recorder) = fx.frame();
        assert_eq!(stats.unready, 1);
        assert_eq!(recorder.draw_order(RenderPass::Opaque), vec![drawn]);
    }

    #[test]
    fn test_removed_entity_leaves_index() {
        let mut fx = Fixture::new();
        let material = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        let entity = fx.model(-4.0, material);
        fx.frame();
        assert_eq!(fx.renderer.indexed_count(), 1);

        fx.renderer.on_entity_removed(entity);
        assert_eq!(fx.renderer.indexed_count(), 0);
    }

    #[test]
    fn test_bounds_follow_moves_between_prepares() {
        let mut fx = Fixture::new();
        let material = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        let entity = fx.model(4.0, material);
        let (stats, _) = fx.frame();
        assert_eq!(stats.visible, 0);

        fx.world
            .get_component_mut::<TransformComponent>(entity)
            .unwrap()
            .position = Vec3::new(0.0, 0.0, -4.0);
        let (stats, recorder) = fx.frame();
        assert_eq!(stats.visible, 1);
        assert_eq!(recorder.draw_order(RenderPass::Opaque), vec![entity]);
    }

    #[test]
    fn test_lost_camera_skips_drawing() {
        let mut fx = Fixture::new();
        let material = fx.resources.add_material(MaterialData::new(ShaderId(0)));
        fx.model(-4.0, material);
        fx.frame();

        fx.world.remove_component::<CameraComponent>(fx.camera).unwrap();
        let mut recorder = CommandRecorder::new();
        let stats = fx
            .renderer
            .render(&fx.world, &fx.resources, fx.camera, &mut recorder)
            .unwrap();
        assert_eq!(stats, RenderStats::default());
        assert_eq!(recorder.draw_count(), 0);
    }

    #[test]
    fn test_depth_quantization() {
        assert_eq!(quantize_depth(1.0), 1000);
        assert_eq!(quantize_depth(-3.0), 0);
        assert_eq!(quantize_depth(f32::MAX), u32::MAX);
    }
}
