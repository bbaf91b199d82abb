//! # Core Engine Module
//!
//! Shared configuration used by the engine loop and the scene core.

pub mod config;

pub use config::{
    CullingConfig,
    EngineConfig,
    MessageBusConfig,
    SceneConfig,
};
