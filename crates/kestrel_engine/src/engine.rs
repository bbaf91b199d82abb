//! Core engine implementation

use crate::{
    application::{AppError, AppEvent, Application},
    config::{Config, ConfigError},
    core::EngineConfig,
    foundation::time::Timer,
    render::{RenderBackend, RenderError},
    scene::Scene,
};
use thiserror::Error;

/// Main engine struct
///
/// The engine owns the scene and the backend it draws through, and runs the
/// frame loop: application update, scene simulate, render.
pub struct Engine {
    scene: Scene,
    backend: Box<dyn RenderBackend>,
    timer: Timer,
    config: EngineConfig,
    running: bool,
    frames: u64,
}

impl Engine {
    /// Create a new engine instance
    pub fn new(config: EngineConfig, backend: Box<dyn RenderBackend>) -> Result<Self, EngineError> {
        config.validate()?;
        log::info!("Initializing engine...");

        Ok(Self {
            scene: Scene::new(config.scene.clone()),
            backend,
            timer: Timer::new(),
            config,
            running: true,
            frames: 0,
        })
    }

    /// Build an engine and run `app` on it until it quits
    pub fn run<T: Application>(
        config: EngineConfig,
        backend: Box<dyn RenderBackend>,
        app: &mut T,
    ) -> Result<(), EngineError> {
        let mut engine = Self::new(config, backend)?;
        engine.run_app(app)
    }

    /// Run the main loop on an existing engine
    pub fn run_app<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))?;

        log::info!("Starting main loop...");
        self.running = true;
        self.timer = Timer::new();

        while self.running {
            let measured = self.timer.update();
            let delta_time = self.config.fixed_timestep.unwrap_or(measured);

            app.update(self, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;

            self.scene.simulate(delta_time);

            app.render(self)
                .map_err(|e| EngineError::ApplicationError(format!("App render: {}", e)))?;

            self.frames += 1;
            if self.config.max_frames.is_some_and(|max| self.frames >= max) {
                log::info!("Reached frame limit of {}", self.frames);
                self.running = false;
            }
        }

        app.cleanup(self);
        log::info!("Engine shutdown complete after {} frames", self.frames);
        Ok(())
    }

    /// Render the current frame
    pub fn render(&mut self) -> Result<(), AppError> {
        self.scene
            .render(self.backend.as_mut())
            .map_err(EngineError::from)?;
        Ok(())
    }

    /// Handle an application event
    pub fn handle_event(&mut self, event: AppEvent) -> Result<(), AppError> {
        match event {
            AppEvent::CloseRequested => self.quit(),
            AppEvent::Resized { width, height } => {
                log::debug!("Viewport resized to {}x{}", width, height);
                self.scene.set_viewport(width, height);
            }
        }
        Ok(())
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// Whether the loop keeps going after this frame
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Get the scene
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Get mutable access to the scene
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    /// Get the render backend
    pub fn backend(&self) -> &dyn RenderBackend {
        self.backend.as_ref()
    }

    /// Get mutable access to the render backend
    pub fn backend_mut(&mut self) -> &mut dyn RenderBackend {
        self.backend.as_mut()
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Frames completed
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.config.fixed_timestep.unwrap_or_else(|| self.timer.delta_time())
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Configuration was rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The render backend failed
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Application error
    #[error("Application error: {0}")]
    ApplicationError(String),
}
