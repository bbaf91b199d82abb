//! Rendering boundary
//!
//! Mesh and material records, and the backend trait renderers draw through.
//! No graphics API lives here.

pub mod backend;
pub mod resource_manager;

pub use backend::{BackendResult, CommandRecorder, RenderBackend, RenderCommand, RenderError, RenderPass};
pub use resource_manager::{
    material_ordinal, BlendMode, MaterialData, MaterialId, MeshData, MeshId, ResourceManager, ShaderId, TextureId,
};
