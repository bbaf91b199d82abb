//! System membership stays in step with component changes

use std::any::Any;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use kestrel_engine::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy)]
struct Alpha;

impl Component for Alpha {}

#[derive(Debug, Clone, Copy)]
struct Beta;

impl Component for Beta {}

type Members = Arc<Mutex<BTreeSet<Entity>>>;

/// Mirrors its membership from the add and remove callbacks alone
struct Mirror {
    requirements: fn() -> Requirements,
    members: Members,
}

impl System for Mirror {
    fn requirements(&self) -> Requirements {
        (self.requirements)()
    }

    fn on_entity_added(&mut self, _world: &mut World, entity: Entity) {
        assert!(self.members.lock().unwrap().insert(entity), "{} added twice", entity);
    }

    fn on_entity_removed(&mut self, entity: Entity) {
        assert!(self.members.lock().unwrap().remove(&entity), "{} removed but never added", entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn expected(scene: &Scene, wants_alpha: bool, wants_beta: bool) -> BTreeSet<Entity> {
    let world = scene.world();
    world
        .entities()
        .filter(|&e| !wants_alpha || world.has_component::<Alpha>(e))
        .filter(|&e| !wants_beta || world.has_component::<Beta>(e))
        .collect()
}

#[test]
fn membership_matches_components_under_random_edits() {
    let mut rng = StdRng::seed_from_u64(0x6b65_7374);
    let mut scene = Scene::new(SceneConfig::default().with_min_free_indices(4));

    let shapes: [(fn() -> Requirements, bool, bool); 3] = [
        (|| Requirements::new().require::<Alpha>(), true, false),
        (|| Requirements::new().require::<Alpha>().require::<Beta>(), true, true),
        (Requirements::new, false, false),
    ];
    let mut systems = Vec::new();
    for (requirements, wants_alpha, wants_beta) in shapes {
        let members = Members::default();
        let id = scene
            .add_system(Box::new(Mirror {
                requirements,
                members: Arc::clone(&members),
            }))
            .unwrap();
        systems.push((id, members, wants_alpha, wants_beta));
    }

    let mut live: Vec<Entity> = Vec::new();
    for step in 0..2_000 {
        let roll = rng.gen_range(0..100);
        if live.is_empty() || roll < 20 {
            live.push(scene.create_entity());
        } else {
            let entity = live[rng.gen_range(0..live.len())];
            match roll {
                20..=39 => scene.add_component(entity, Alpha).unwrap(),
                40..=59 => scene.add_component(entity, Beta).unwrap(),
                60..=74 => {
                    scene.remove_component::<Alpha>(entity).unwrap();
                }
                75..=89 => {
                    scene.remove_component::<Beta>(entity).unwrap();
                }
                _ => {
                    scene.destroy_entity(entity).unwrap();
                    live.retain(|&e| e != entity);
                }
            }
        }

        for (id, _, wants_alpha, wants_beta) in &systems {
            let listed: BTreeSet<Entity> = scene.system_entities(*id).iter().copied().collect();
            assert_eq!(listed.len(), scene.system_entities(*id).len(), "duplicate member at step {}", step);
            assert_eq!(listed, expected(&scene, *wants_alpha, *wants_beta), "step {}", step);
        }

        if step % 50 == 0 {
            scene.simulate(0.016);
            for (_, members, wants_alpha, wants_beta) in &systems {
                assert_eq!(*members.lock().unwrap(), expected(&scene, *wants_alpha, *wants_beta));
            }
        }
    }
}
