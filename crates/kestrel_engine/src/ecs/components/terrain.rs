//! Terrain patch component

use crate::ecs::Component;
use crate::streaming::{TerrainMesh, TerrainParams};

/// A height-field patch whose mesh is built in the background
#[derive(Debug, Clone, Default)]
pub struct TerrainComponent {
    params: TerrainParams,
    revision: u64,
    mesh: Option<TerrainMesh>,
    mesh_revision: Option<u64>,
}

impl Component for TerrainComponent {}

impl TerrainComponent {
    /// Create a patch; its mesh is built on the next frames
    pub fn new(params: TerrainParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Current parameters
    pub fn params(&self) -> &TerrainParams {
        &self.params
    }

    /// Change parameters; the existing mesh is kept until its replacement arrives
    pub fn set_params(&mut self, params: TerrainParams) {
        if params != self.params {
            self.params = params;
            self.revision = self.revision.wrapping_add(1);
        }
    }

    /// Bumped on every parameter change
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Latest finished mesh, possibly from older parameters
    pub fn mesh(&self) -> Option<&TerrainMesh> {
        self.mesh.as_ref()
    }

    /// Whether the mesh matches the current parameters
    pub fn is_ready(&self) -> bool {
        self.mesh_revision == Some(self.revision)
    }

    /// Store a mesh built for `revision`; stale ones are rejected
    pub fn accept_mesh(&mut self, revision: u64, mesh: TerrainMesh) -> bool {
        if revision != self.revision {
            return false;
        }
        self.mesh = Some(mesh);
        self.mesh_revision = Some(revision);
        true
    }
}
