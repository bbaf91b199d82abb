//! Rebuilds terrain meshes on a background worker

use std::any::Any;

use crate::ecs::components::TerrainComponent;
use crate::ecs::{Entity, Requirements, System, SystemContext};
use crate::streaming::{BackgroundWorker, TerrainMesh, TerrainMeshBuilder, TerrainParams, WorkerError};

struct TerrainJob {
    entity: Entity,
    revision: u64,
    params: TerrainParams,
}

struct TerrainResult {
    entity: Entity,
    revision: u64,
    mesh: TerrainMesh,
}

/// Hands one out-of-date terrain at a time to the worker and stores the
/// finished meshes back into their components
pub struct TerrainSystem {
    worker: BackgroundWorker<TerrainJob, TerrainResult>,
    in_flight: Option<(Entity, u64)>,
    completed: u64,
    discarded: u64,
}

impl TerrainSystem {
    /// Start the worker thread
    pub fn new() -> Result<Self, WorkerError> {
        let worker = BackgroundWorker::spawn("terrain-builder", |job: TerrainJob| TerrainResult {
            entity: job.entity,
            revision: job.revision,
            mesh: TerrainMeshBuilder::build(&job.params),
        })?;
        Ok(Self {
            worker,
            in_flight: None,
            completed: 0,
            discarded: 0,
        })
    }

    /// Whether a build is running
    pub fn is_building(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Meshes stored into components
    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Meshes thrown away because their terrain changed or vanished
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn collect(&mut self, ctx: &mut SystemContext<'_>) {
        let Some(result) = self.worker.try_take() else {
            return;
        };
        self.in_flight = None;

        let accepted = ctx
            .world
            .get_component_mut::<TerrainComponent>(result.entity)
            .map(|terrain| terrain.accept_mesh(result.revision, result.mesh))
            .unwrap_or(false);
        if accepted {
            log::debug!("terrain {} rev {} ready", result.entity, result.revision);
            self.completed += 1;
        } else {
            log::trace!("discarding stale terrain mesh for {}", result.entity);
            self.discarded += 1;
        }
    }

    fn dispatch(&mut self, ctx: &SystemContext<'_>) {
        if self.in_flight.is_some() {
            return;
        }
        for &entity in ctx.entities() {
            let Some(terrain) = ctx.world.get_component::<TerrainComponent>(entity) else {
                continue;
            };
            if terrain.is_ready() {
                continue;
            }
            let job = TerrainJob {
                entity,
                revision: terrain.revision(),
                params: *terrain.params(),
            };
            self.in_flight = Some((entity, job.revision));
            self.worker.request(job);
            log::trace!("requested terrain build for {}", entity);
            return;
        }
    }
}

impl System for TerrainSystem {
    fn name(&self) -> &str {
        "TerrainSystem"
    }

    fn requirements(&self) -> Requirements {
        Requirements::new().require::<TerrainComponent>()
    }

    fn process(&mut self, ctx: &mut SystemContext<'_>, _dt: f32) {
        self.collect(ctx);
        self.dispatch(ctx);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
