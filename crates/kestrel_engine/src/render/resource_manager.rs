//! Resource Manager - CPU-side mesh and material records
//!
//! Components refer to meshes and materials by generational id. The records
//! here carry what culling and sorting need (bounds, submesh count, blend
//! mode) plus a `ready` flag; anything that is not ready yet is skipped by
//! renderers instead of being drawn half-loaded.

use crate::foundation::collections::{HandleMap, Key, new_key_type};
use crate::spatial::AABB;

new_key_type! {
    /// Handle to a mesh record
    pub struct MeshId;
    /// Handle to a material record
    pub struct MaterialId;
}

/// Shader program identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ShaderId(pub u32);

/// Texture identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureId(pub u32);

/// How a material's fragments combine with the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Depth-tested and written, no blending
    #[default]
    Opaque,
    /// Standard alpha blending
    Alpha,
    /// Additive blending
    Additive,
    /// Multiplicative blending
    Multiply,
}

impl BlendMode {
    /// Whether geometry using this mode goes in the transparent pass
    pub fn is_transparent(self) -> bool {
        self != BlendMode::Opaque
    }

    /// Ordering weight within the transparent pass.
    ///
    /// The transparent list is sorted descending, so higher values draw first.
    pub fn priority(self) -> i64 {
        match self {
            BlendMode::Opaque => 0,
            BlendMode::Additive => 0,
            BlendMode::Multiply => 1,
            BlendMode::Alpha => 2,
        }
    }
}

/// Material record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MaterialData {
    /// Shader to bind
    pub shader: ShaderId,
    /// Blending behaviour
    pub blend_mode: BlendMode,
    /// Bound textures in slot order
    pub textures: Vec<TextureId>,
    /// False while the material is still loading
    pub ready: bool,
}

impl MaterialData {
    /// Ready material with the given shader
    pub fn new(shader: ShaderId) -> Self {
        Self {
            shader,
            ready: true,
            ..Self::default()
        }
    }

    /// Builder pattern: Set blend mode
    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Builder pattern: Add a texture
    pub fn with_texture(mut self, texture: TextureId) -> Self {
        self.textures.push(texture);
        self
    }

    /// Builder pattern: Set readiness
    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }
}

/// Mesh record
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// Number of independently drawn parts
    pub submesh_count: u32,
    /// Local-space bounds
    pub bounds: AABB,
    /// False while the mesh is still loading
    pub ready: bool,
}

impl MeshData {
    /// Ready mesh
    pub fn new(submesh_count: u32, bounds: AABB) -> Self {
        Self {
            submesh_count,
            bounds,
            ready: true,
        }
    }

    /// Builder pattern: Set readiness
    pub fn with_ready(mut self, ready: bool) -> Self {
        self.ready = ready;
        self
    }
}

/// Owns every mesh and material record of a scene
#[derive(Debug, Default)]
pub struct ResourceManager {
    meshes: HandleMap<MeshId, MeshData>,
    materials: HandleMap<MaterialId, MaterialData>,
}

impl ResourceManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mesh
    pub fn add_mesh(&mut self, mesh: MeshData) -> MeshId {
        self.meshes.insert(mesh)
    }

    /// Register a material
    pub fn add_material(&mut self, material: MaterialData) -> MaterialId {
        self.materials.insert(material)
    }

    /// Mesh record, if the id is still valid
    pub fn mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.meshes.get(id)
    }

    /// Mutable mesh record
    pub fn mesh_mut(&mut self, id: MeshId) -> Option<&mut MeshData> {
        self.meshes.get_mut(id)
    }

    /// Material record, if the id is still valid
    pub fn material(&self, id: MaterialId) -> Option<&MaterialData> {
        self.materials.get(id)
    }

    /// Mutable material record
    pub fn material_mut(&mut self, id: MaterialId) -> Option<&mut MaterialData> {
        self.materials.get_mut(id)
    }

    /// Drop a mesh record; ids held by components become invalid
    pub fn remove_mesh(&mut self, id: MeshId) -> Option<MeshData> {
        self.meshes.remove(id)
    }

    /// Drop a material record
    pub fn remove_material(&mut self, id: MaterialId) -> Option<MaterialData> {
        self.materials.remove(id)
    }

    /// Mesh that exists and has finished loading
    pub fn ready_mesh(&self, id: MeshId) -> Option<&MeshData> {
        self.mesh(id).filter(|mesh| mesh.ready)
    }

    /// Material that exists and has finished loading
    pub fn ready_material(&self, id: MaterialId) -> Option<&MaterialData> {
        self.material(id).filter(|material| material.ready)
    }

    /// Number of registered meshes
    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    /// Number of registered materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

/// Stable small integer for a material, used in opaque sort keys
pub fn material_ordinal(id: MaterialId) -> u32 {
    // low half of the ffi value is the slot index
    (id.data().as_ffi() & 0xffff_ffff) as u32
}
