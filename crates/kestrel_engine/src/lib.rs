//! # Kestrel Engine
//!
//! ECS scene core for real-time games.
//!
//! ## Features
//!
//! - **ECS Architecture**: generational entities, sparse component pools and
//!   systems that see exactly the entities carrying their components
//! - **Scene Scheduling**: systems run in registration order each frame
//! - **Message Bus**: bounded, double-buffered plain-data messages
//! - **Model Rendering**: frustum culling through a pluggable spatial index,
//!   sorted opaque and transparent draw lists per camera
//! - **Background Work**: a single worker thread for derived data such as
//!   terrain meshes
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kestrel_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let scene = engine.scene_mut();
//!         let renderer = ModelRenderer::new(&scene.config().culling);
//!         scene.add_system(Box::new(renderer))?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default().with_max_frames(60);
//!     let mut app = MyApp;
//!     Engine::run(config, Box::new(CommandRecorder::new()), &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;

pub mod ecs;
pub mod events;
pub mod foundation;
pub mod net;
pub mod render;
pub mod scene;
pub mod spatial;
pub mod streaming;

mod application;
mod engine;

pub use application::{AppError, AppEvent, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AppError, AppEvent, Application, Engine, EngineError,
        config::{Config, ConfigError},
        core::{CullingConfig, EngineConfig, MessageBusConfig, SceneConfig},
        ecs::{
            components::{
                AnimationClip, AnimationFrame, CallbackComponent, CameraComponent, ModelComponent,
                RenderFlags, SpriteAnimationComponent, SpriteComponent, TerrainComponent, TextureRect,
                TransformComponent,
            },
            systems::{CallbackSystem, SpriteAnimator, SpriteSystem, TerrainSystem},
            Component, EcsError, Entity, Requirements, System, SystemContext, World,
        },
        events::{Message, MessageBus, MessageData, MessageKind, OverflowPolicy, SceneEvent, SpriteAnimationEvent},
        foundation::{
            math::{Mat4, Quat, Vec2, Vec3},
            time::{Stopwatch, SysTime, Timer},
        },
        render::{
            BlendMode, CommandRecorder, MaterialData, MaterialId, MeshData, MeshId, RenderBackend, ResourceManager,
            ShaderId, TextureId,
        },
        scene::{ModelRenderer, Renderable, Scene},
        spatial::{CullStrategy, AABB},
        streaming::TerrainParams,
    };
}
