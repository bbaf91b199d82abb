//! Backend abstraction for the rendering system
//!
//! Renderers describe a frame as passes of material binds and submesh draws.
//! A backend turns those calls into GPU work; [`CommandRecorder`] just keeps
//! them, which is what headless runs and tests use.

use crate::ecs::Entity;
use crate::foundation::math::Mat4;
use super::{MaterialData, MaterialId, MeshId};

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Rendering errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The backend failed to carry out a call
    #[error("Backend error: {0}")]
    Backend(String),
}

/// The two passes drawn per camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderPass {
    /// Opaque geometry, front to back
    Opaque,
    /// Blended geometry, back to front
    Transparent,
}

/// Main rendering backend trait
pub trait RenderBackend {
    /// Start of a frame
    fn begin_frame(&mut self) -> BackendResult<()> {
        Ok(())
    }

    /// Start drawing one pass for a camera
    fn begin_pass(&mut self, camera: Entity, pass: RenderPass, view_projection: &Mat4) -> BackendResult<()>;

    /// Make a material current
    fn bind_material(&mut self, id: MaterialId, material: &MaterialData) -> BackendResult<()>;

    /// Draw one submesh with the current material
    fn draw_submesh(&mut self, entity: Entity, mesh: MeshId, submesh: u32, world: &Mat4) -> BackendResult<()>;

    /// End of the current pass
    fn end_pass(&mut self, pass: RenderPass) -> BackendResult<()> {
        let _ = pass;
        Ok(())
    }

    /// End of a frame
    fn end_frame(&mut self) -> BackendResult<()> {
        Ok(())
    }
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    /// Pass start
    BeginPass {
        /// Camera drawn from
        camera: Entity,
        /// Which pass
        pass: RenderPass,
    },
    /// Material change
    BindMaterial(MaterialId),
    /// Submesh draw
    Draw {
        /// Owner of the model
        entity: Entity,
        /// Mesh drawn
        mesh: MeshId,
        /// Part of the mesh
        submesh: u32,
    },
    /// Pass end
    EndPass(RenderPass),
}

/// Backend that records calls instead of drawing
#[derive(Debug, Default)]
pub struct CommandRecorder {
    commands: Vec<RenderCommand>,
    frames: u64,
}

impl CommandRecorder {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls recorded since the start of the current frame
    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Frames begun so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Entities drawn in a pass, in draw order
    pub fn draw_order(&self, pass: RenderPass) -> Vec<Entity> {
        let mut current = None;
        let mut order = Vec::new();
        for command in &self.commands {
            match command {
                RenderCommand::BeginPass { pass: p, .. } => current = Some(*p),
                RenderCommand::EndPass(_) => current = None,
                RenderCommand::Draw { entity, .. } if current == Some(pass) => {
                    if order.last() != Some(entity) {
                        order.push(*entity);
                    }
                }
                _ => {}
            }
        }
        order
    }

    /// Number of material binds recorded
    pub fn bind_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::BindMaterial(_)))
            .count()
    }

    /// Number of submesh draws recorded
    pub fn draw_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, RenderCommand::Draw { .. }))
            .count()
    }

    /// Forget everything recorded
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl RenderBackend for CommandRecorder {
    fn begin_frame(&mut self) -> BackendResult<()> {
        self.commands.clear();
        self.frames += 1;
        Ok(())
    }

    fn begin_pass(&mut self, camera: Entity, pass: RenderPass, _view_projection: &Mat4) -> BackendResult<()> {
        self.commands.push(RenderCommand::BeginPass { camera, pass });
        Ok(())
    }

    fn bind_material(&mut self, id: MaterialId, _material: &MaterialData) -> BackendResult<()> {
        self.commands.push(RenderCommand::BindMaterial(id));
        Ok(())
    }

    fn draw_submesh(&mut self, entity: Entity, mesh: MeshId, submesh: u32, _world: &Mat4) -> BackendResult<()> {
        self.commands.push(RenderCommand::Draw { entity, mesh, submesh });
        Ok(())
    }

    fn end_pass(&mut self, pass: RenderPass) -> BackendResult<()> {
        self.commands.push(RenderCommand::EndPass(pass));
        Ok(())
    }
}
