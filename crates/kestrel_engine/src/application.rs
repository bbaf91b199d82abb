//! Application trait and lifecycle management

use crate::ecs::EcsError;
use crate::engine::{Engine, EngineError};
use crate::streaming::WorkerError;
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to drive a scene with the engine loop.
pub trait Application {
    /// Initialize the application
    ///
    /// Called once before the first frame. Create entities, register systems
    /// and load resources here.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Update the application
    ///
    /// Called every frame before the scene simulates.
    ///
    /// # Arguments
    /// * `engine` - Mutable reference to the engine
    /// * `delta_time` - Time since last frame in seconds
    fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError>;

    /// Render the application
    ///
    /// Called after the scene simulated. The default draws the scene.
    fn render(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        engine.render()
    }

    /// Handle application events
    fn handle_event(&mut self, engine: &mut Engine, event: AppEvent) -> Result<(), AppError> {
        engine.handle_event(event)
    }

    /// Cleanup the application
    ///
    /// Called once after the last frame.
    fn cleanup(&mut self, engine: &mut Engine);
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Entity or component operation failed
    #[error("ECS error: {0}")]
    Ecs(#[from] EcsError),

    /// A background worker could not start
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}

/// Application events
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The host asked the application to close
    CloseRequested,

    /// The output surface changed size
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },
}
