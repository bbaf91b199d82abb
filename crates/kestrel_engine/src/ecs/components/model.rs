//! Model component for entities drawn by the model renderer

use bitflags::bitflags;

use crate::ecs::Component;
use crate::render::{MaterialId, MeshId};

bitflags! {
    /// Which cameras may draw a model.
    ///
    /// A model is drawn by a camera only when their flags share a bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u64 {
        /// Main view
        const MAIN = 1 << 0;
        /// Reflection passes
        const REFLECTION = 1 << 1;
        /// Shadow map passes
        const SHADOW = 1 << 2;
        /// Overlays and editor views
        const OVERLAY = 1 << 3;
        /// Every camera
        const ALL = u64::MAX;
    }
}

impl Default for RenderFlags {
    fn default() -> Self {
        RenderFlags::MAIN
    }
}

/// Component for entities that can be rendered
#[derive(Debug, Clone, PartialEq)]
pub struct ModelComponent {
    /// Mesh to draw
    pub mesh: MeshId,

    /// One material per submesh
    pub materials: Vec<MaterialId>,

    /// Camera filter
    pub render_flags: RenderFlags,

    /// Whether this object is visible
    pub visible: bool,
}

impl Component for ModelComponent {}

impl ModelComponent {
    /// Create a new model with one material per submesh
    pub fn new(mesh: MeshId, materials: Vec<MaterialId>) -> Self {
        Self {
            mesh,
            materials,
            render_flags: RenderFlags::default(),
            visible: true,
        }
    }

    /// Builder pattern: Set render flags
    pub fn with_render_flags(mut self, flags: RenderFlags) -> Self {
        self.render_flags = flags;
        self
    }

    /// Set visibility
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
